//! Chunked transfer integration tests: upload and download sessions driven
//! through the operation layer, including ticket expiry and the cleanup of
//! dangling blobs when a finalize fails.

use std::time::Duration;

use base64::Engine as _;
use tempfile::{tempdir, TempDir};

use stowage::blobs::CHUNK_SIZE;
use stowage::config::AppConfig;
use stowage::error::codes;
use stowage::identity::Principal;
use stowage::server::{ops, AppState};
use stowage::tickets::TicketCache;

fn test_state() -> (AppState, TempDir) {
    let tmp = tempdir().unwrap();
    let state = AppState::new(AppConfig::for_root(tmp.path(), "test-secret")).unwrap();
    (state, tmp)
}

fn seeded_owner(state: &AppState) -> Principal {
    ops::register_owner(state, "Owner", "a@x", "P@ssw0rd!").unwrap();
    let account = state.graph.get_owner_by_email("a@x").unwrap();
    let owner = Principal {
        account_id: account.id,
        name: account.name,
        username: account.email,
        is_owner: true,
    };
    ops::create_workspace(state, &owner, "acme").unwrap();
    ops::create_directory(state, &owner, "acme", "a").unwrap();
    owner
}

fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[tokio::test]
async fn two_chunk_upload_persists_the_file_and_round_trips_on_download() {
    let (state, _tmp) = test_state();
    let owner = seeded_owner(&state);

    let total_size: u64 = 1_500_000;
    let payload: Vec<u8> = (0..total_size).map(|i| (i % 251) as u8).collect();

    let issued = ops::begin_upload(&state, &owner, "acme/a", "x.bin", total_size).unwrap();
    let link = issued["uploadLink"].as_str().unwrap().to_string();

    // No disk write before the first chunk arrives.
    let ticket = state.tickets.get(&link).unwrap();
    assert!(state.blobs.blob_len("acme", &ticket.file.id).is_err());

    let first = ops::upload_chunk(&state, &link, 1, 2, &b64(&payload[..CHUNK_SIZE as usize])).unwrap();
    assert!(first.get("newFile").is_none());

    let last = ops::upload_chunk(&state, &link, 2, 2, &b64(&payload[CHUNK_SIZE as usize..])).unwrap();
    let new_file = &last["newFile"];
    assert_eq!(new_file["size"], total_size);
    assert_eq!(new_file["location"], "acme/a/x.bin");

    let file = state.graph.get_file(&"acme/a/x.bin".parse().unwrap()).unwrap();
    assert_eq!(file.size, total_size);
    assert_eq!(state.blobs.blob_len("acme", &file.id).unwrap(), total_size);
    // The ticket is consumed once the upload persists.
    assert!(state.tickets.get(&link).is_none());

    // Download it back in two chunks and compare bytes.
    let started = ops::begin_download(&state, &owner, "acme/a/x.bin").unwrap();
    assert_eq!(started["chunkTotal"], 2);
    assert_eq!(started["chunkSize"], CHUNK_SIZE);
    let dlink = started["downloadLink"].as_str().unwrap();
    let mut fetched = ops::download_chunk(&state, dlink, 1).unwrap();
    fetched.extend(ops::download_chunk(&state, dlink, 2).unwrap());
    assert_eq!(fetched, payload);
}

#[tokio::test]
async fn unknown_and_expired_tickets_are_rejected() {
    let (mut state, _tmp) = test_state();
    let owner = seeded_owner(&state);

    let err = ops::upload_chunk(&state, "no-such-link", 1, 1, &b64(b"xx")).unwrap_err();
    assert_eq!(err.code_str(), codes::INVALID_UPLOAD_ID);
    let err = ops::download_chunk(&state, "no-such-link", 1).unwrap_err();
    assert_eq!(err.code_str(), codes::INVALID_UPLOAD_ID);

    // With a zero TTL every issued ticket is already expired.
    state.tickets = TicketCache::with_ttl(Duration::from_millis(0));
    let issued = ops::begin_upload(&state, &owner, "acme/a", "y.bin", 10).unwrap();
    let link = issued["uploadLink"].as_str().unwrap();
    let err = ops::upload_chunk(&state, link, 1, 1, &b64(b"0123456789")).unwrap_err();
    assert_eq!(err.code_str(), codes::INVALID_UPLOAD_ID);
}

#[tokio::test]
async fn malformed_chunk_payload_is_invalid_data() {
    let (state, _tmp) = test_state();
    let owner = seeded_owner(&state);
    let issued = ops::begin_upload(&state, &owner, "acme/a", "y.bin", 10).unwrap();
    let link = issued["uploadLink"].as_str().unwrap();
    let err = ops::upload_chunk(&state, link, 1, 1, "this is not base64!!!").unwrap_err();
    assert_eq!(err.code_str(), codes::INVALID_DATA);
}

#[tokio::test]
async fn finalize_name_collision_reports_conflict_and_cleans_the_blob() {
    let (state, _tmp) = test_state();
    let owner = seeded_owner(&state);

    // First upload takes the name.
    let issued = ops::begin_upload(&state, &owner, "acme/a", "x.bin", 3).unwrap();
    let link = issued["uploadLink"].as_str().unwrap().to_string();
    ops::upload_chunk(&state, &link, 1, 1, &b64(b"abc")).unwrap();

    // Second upload with the same name fails at finalize.
    let issued = ops::begin_upload(&state, &owner, "acme/a", "x.bin", 3).unwrap();
    let link = issued["uploadLink"].as_str().unwrap().to_string();
    let doomed_id = state.tickets.get(&link).unwrap().file.id;
    let err = ops::upload_chunk(&state, &link, 1, 1, &b64(b"def")).unwrap_err();
    assert_eq!(err.code_str(), codes::FILE_ALREADY_EXISTS);

    // The dangling blob is gone and the ticket revoked.
    assert!(state.blobs.blob_len("acme", &doomed_id).is_err());
    assert!(state.tickets.get(&link).is_none());

    // The original file still reads back intact.
    let file = state.graph.get_file(&"acme/a/x.bin".parse().unwrap()).unwrap();
    assert_eq!(state.blobs.blob_len("acme", &file.id).unwrap(), 3);
}

#[tokio::test]
async fn small_file_downloads_in_one_chunk() {
    let (state, _tmp) = test_state();
    let owner = seeded_owner(&state);
    let issued = ops::begin_upload(&state, &owner, "acme/a", "tiny.bin", 10).unwrap();
    let link = issued["uploadLink"].as_str().unwrap();
    ops::upload_chunk(&state, link, 1, 1, &b64(b"0123456789")).unwrap();

    let started = ops::begin_download(&state, &owner, "acme/a/tiny.bin").unwrap();
    assert_eq!(started["chunkTotal"], 1);
    let chunk =
        ops::download_chunk(&state, started["downloadLink"].as_str().unwrap(), 1).unwrap();
    assert_eq!(chunk, b"0123456789");
}

#[tokio::test]
async fn download_of_a_missing_file_is_resource_not_found() {
    let (state, _tmp) = test_state();
    let owner = seeded_owner(&state);
    let err = ops::begin_download(&state, &owner, "acme/a/ghost.bin").unwrap_err();
    assert_eq!(err.code_str(), codes::RESOURCE_NOT_FOUND);
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn upload_requires_create_permission_at_the_parent() {
    let (state, _tmp) = test_state();
    let owner = seeded_owner(&state);
    let account =
        ops::create_service_account(&state, &owner, "acme", "svc", "svc", "P@ssw0rd!").unwrap();
    let service = Principal {
        account_id: account.id,
        name: account.name,
        username: "svc@acme".into(),
        is_owner: false,
    };
    let err = ops::begin_upload(&state, &service, "acme/a", "z.bin", 10).unwrap_err();
    assert_eq!(err.code_str(), codes::PERMISSION_DENIED);

    // Uploading into a missing parent is an invalid location even for the owner.
    let err = ops::begin_upload(&state, &owner, "acme/ghost", "z.bin", 10).unwrap_err();
    assert_eq!(err.code_str(), codes::INVALID_LOCATION);

    // Size zero is rejected outright.
    let err = ops::begin_upload(&state, &owner, "acme/a", "z.bin", 0).unwrap_err();
    assert_eq!(err.code_str(), codes::INVALID_DATA);
}

#[tokio::test]
async fn file_delete_removes_graph_entry_and_blob() {
    let (state, _tmp) = test_state();
    let owner = seeded_owner(&state);
    let issued = ops::begin_upload(&state, &owner, "acme/a", "x.bin", 3).unwrap();
    let link = issued["uploadLink"].as_str().unwrap().to_string();
    ops::upload_chunk(&state, &link, 1, 1, &b64(b"abc")).unwrap();
    let file = state.graph.get_file(&"acme/a/x.bin".parse().unwrap()).unwrap();

    ops::delete_file(&state, &owner, "acme/a/x.bin").unwrap();
    assert!(state.graph.get_file(&"acme/a/x.bin".parse().unwrap()).is_err());
    // Blob removal is spawned; give it a moment.
    for _ in 0..50 {
        if state.blobs.blob_len("acme", &file.id).is_err() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(state.blobs.blob_len("acme", &file.id).is_err());

    // Deleting again is a no-op success.
    ops::delete_file(&state, &owner, "acme/a/x.bin").unwrap();
}
