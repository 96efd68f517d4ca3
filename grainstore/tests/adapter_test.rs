use chrono::{TimeZone, Utc};
use grainstore::{
    ActorHandle, ActorReference, ActorState, FailureKind, Operation, PrimaryKey, Revision,
    StorageAdapter, key_mapper, store::InMemoryDocumentStore,
};
use grainstore_test_harness::{
    Host,
    sample::{RosterActor, SampleActor, SampleState},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    level: u32,
    tags: Vec<String>,
}

async fn adapter(store: &InMemoryDocumentStore) -> StorageAdapter<InMemoryDocumentStore> {
    StorageAdapter::builder("test")
        .with_store(store.clone())
        .init()
        .await
        .unwrap()
}

fn player(name: &str) -> ActorReference {
    ActorReference::new("Player", PrimaryKey::String(name.to_string())).unwrap()
}

fn sample(id: i64) -> ActorReference {
    ActorReference::new("SampleActor", PrimaryKey::Integer(id)).unwrap()
}

#[tokio::test]
async fn written_state_reads_back() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let adapter = adapter(&store).await;

    let profile = Profile {
        name: "ada".to_string(),
        level: 3,
        tags: vec!["admin".to_string()],
    };
    let mut written = ActorState::new(profile.clone());
    adapter
        .write_state("game::Player", &player("ada"), &mut written)
        .await?;
    let revision = written.etag.clone().expect("write sets the etag");

    let mut read = ActorState::<Profile>::default();
    adapter
        .read_state("game::Player", &player("ada"), &mut read)
        .await?;
    assert_eq!(read.state, profile);
    assert_eq!(read.etag, Some(revision));
    Ok(())
}

#[tokio::test]
async fn reading_a_missing_actor_keeps_the_default() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let adapter = adapter(&store).await;

    let pristine = Profile {
        name: "unnamed".to_string(),
        ..Profile::default()
    };
    let mut slot = ActorState {
        state: pristine.clone(),
        etag: Some(Revision::from("_stale")),
    };
    adapter
        .read_state("game::Player", &player("nobody"), &mut slot)
        .await?;
    assert_eq!(slot.state, pristine);
    assert_eq!(slot.etag, None);
    Ok(())
}

#[tokio::test]
async fn stale_writes_are_rejected() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let adapter = adapter(&store).await;
    let ada = player("ada");

    let mut slot = ActorState::new(Profile::default());
    adapter.write_state("Player", &ada, &mut slot).await?;
    let stale = slot.clone();

    slot.state.level = 1;
    adapter.write_state("Player", &ada, &mut slot).await?;

    let mut stale = stale;
    stale.state.level = 99;
    let err = adapter
        .write_state("Player", &ada, &mut stale)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::ConcurrencyConflict);
    assert_eq!(err.operation(), Operation::Write);

    let mut read = ActorState::<Profile>::default();
    adapter.read_state("Player", &ada, &mut read).await?;
    assert_eq!(read.state.level, 1);
    assert_eq!(read.etag, slot.etag);
    Ok(())
}

#[tokio::test]
async fn racing_first_writes_report_a_duplicate_key() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let adapter = adapter(&store).await;
    let ada = player("ada");

    let mut first = ActorState::new(Profile::default());
    let mut second = ActorState::new(Profile {
        level: 2,
        ..Profile::default()
    });
    adapter.write_state("Player", &ada, &mut first).await?;
    let err = adapter
        .write_state("Player", &ada, &mut second)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::DuplicateKey);
    assert_eq!(second.etag, None);
    Ok(())
}

#[tokio::test]
async fn cleared_actors_read_as_new() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let adapter = adapter(&store).await;
    let ada = player("ada");

    let mut slot = ActorState::new(Profile {
        level: 5,
        ..Profile::default()
    });
    adapter.write_state("Player", &ada, &mut slot).await?;
    adapter.clear_state("Player", &ada, &mut slot).await?;
    assert_eq!(slot.etag, None);
    assert_eq!(store.document_count("Player"), 0);

    let mut read = ActorState::<Profile>::default();
    adapter.read_state("Player", &ada, &mut read).await?;
    assert_eq!(read, ActorState::default());

    // A cleared slot starts over with an insert
    adapter.write_state("Player", &ada, &mut slot).await?;
    assert!(slot.etag.is_some());
    Ok(())
}

#[tokio::test]
async fn clearing_a_missing_actor_is_not_found() {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let adapter = adapter(&store).await;

    let mut slot = ActorState::<Profile>::default();
    let err = adapter
        .clear_state("Player", &player("nobody"), &mut slot)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::NotFound);
    assert_eq!(err.operation(), Operation::Clear);
}

#[tokio::test]
async fn types_with_the_same_last_segment_share_a_collection() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let adapter = adapter(&store).await;

    let mut slot = ActorState::new(Profile {
        level: 4,
        ..Profile::default()
    });
    adapter.write_state("A.Foo", &player("ada"), &mut slot).await?;

    let mut read = ActorState::<Profile>::default();
    adapter.read_state("B.Foo", &player("ada"), &mut read).await?;
    assert_eq!(read.state.level, 4);
    assert_eq!(store.document_count("Foo"), 1);
    Ok(())
}

#[tokio::test]
async fn generic_actor_types_use_their_base_name() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let adapter = adapter(&store).await;

    let mut slot = ActorState::new(Profile::default());
    adapter
        .write_state("game::Wrapper<game::Player>", &player("ada"), &mut slot)
        .await?;
    assert_eq!(store.document_count("Wrapper"), 1);
    assert_eq!(store.create_collection_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn collections_are_created_once() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let adapter = adapter(&store).await;

    for name in ["ada", "grace", "edsger"] {
        let mut slot = ActorState::new(Profile::default());
        adapter
            .write_state("game::Player", &player(name), &mut slot)
            .await?;
        adapter
            .read_state("game::Player", &player(name), &mut slot)
            .await?;
    }
    assert_eq!(store.create_collection_calls(), 1);
    assert_eq!(store.document_count("Player"), 3);
    Ok(())
}

#[tokio::test]
async fn existing_collections_are_not_recreated() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::with_collections(["Player"]);
    let adapter = adapter(&store).await;

    let mut slot = ActorState::new(Profile::default());
    adapter.write_state("Player", &player("ada"), &mut slot).await?;
    assert_eq!(store.create_collection_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn refused_collections_surface_on_the_document_operation() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let adapter = adapter(&store).await;
    let ada = player("ada");

    store.set_reject_creates(true);
    let mut slot = ActorState::new(Profile {
        level: 2,
        ..Profile::default()
    });
    let err = adapter
        .write_state("Player", &ada, &mut slot)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::CollectionUnavailable);
    assert_eq!(err.operation(), Operation::Write);
    assert_eq!(slot.etag, None);

    let mut read = ActorState::<Profile>::default();
    let err = adapter.read_state("Player", &ada, &mut read).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::CollectionUnavailable);
    assert_eq!(store.create_collection_calls(), 2);

    // The failed creation was not cached, so the next call tries again
    store.set_reject_creates(false);
    adapter.write_state("Player", &ada, &mut slot).await?;
    assert!(slot.etag.is_some());
    assert_eq!(store.create_collection_calls(), 3);
    assert_eq!(store.document_count("Player"), 1);
    Ok(())
}

#[tokio::test]
async fn reads_tolerate_documents_written_elsewhere() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let key = key_mapper::document_key(&player("ada"));
    store.put_raw_document(
        "Player",
        &key,
        json!({
            "_key": key,
            "_rev": "_external",
            "_id": "Player/whatever",
            "state": { "name": "ada", "retired": true }
        }),
    );
    let adapter = adapter(&store).await;

    let mut slot = ActorState::new(Profile {
        level: 7,
        ..Profile::default()
    });
    adapter.read_state("Player", &player("ada"), &mut slot).await?;
    assert_eq!(slot.state.name, "ada");
    // Missing from the document, so the default rather than the unsaved value
    assert_eq!(slot.state.level, Profile::default().level);
    assert_eq!(slot.etag, Some(Revision::from("_external")));
    Ok(())
}

#[tokio::test]
async fn null_state_resets_to_the_default() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let key = key_mapper::document_key(&player("ada"));
    store.put_raw_document(
        "Player",
        &key,
        json!({ "_key": key, "_rev": "_1", "state": null }),
    );
    let adapter = adapter(&store).await;

    let mut slot = ActorState::new(Profile {
        level: 7,
        ..Profile::default()
    });
    adapter.read_state("Player", &player("ada"), &mut slot).await?;
    assert_eq!(slot.state, Profile::default());
    assert_eq!(slot.etag, Some(Revision::from("_1")));
    Ok(())
}

#[tokio::test]
async fn store_outages_are_transport_failures() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let adapter = adapter(&store).await;
    let mut slot = ActorState::new(Profile::default());
    adapter.write_state("Player", &player("ada"), &mut slot).await?;

    store.set_offline(true);
    let before = slot.clone();
    for (operation, err) in [
        (
            Operation::Read,
            adapter.read_state("Player", &player("ada"), &mut slot).await,
        ),
        (
            Operation::Write,
            adapter.write_state("Player", &player("ada"), &mut slot).await,
        ),
        (
            Operation::Clear,
            adapter.clear_state("Player", &player("ada"), &mut slot).await,
        ),
    ] {
        let err = err.unwrap_err();
        assert_eq!(err.kind(), FailureKind::TransportFailure);
        assert_eq!(err.operation(), operation);
    }
    assert_eq!(slot, before);
    Ok(())
}

#[tokio::test]
async fn sample_actor_values_survive_reactivation() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let host = Host::new(adapter(&store).await);

    let date = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 58).unwrap();
    let guid = Uuid::new_v4();

    let mut first = host.activate::<SampleActor>(sample(1)).await?;
    first.set("hello", 42, date, guid).await?;
    let written_revision = first.slot().etag.clone();
    assert!(written_revision.is_some());
    drop(first);

    let second = host.activate::<SampleActor>(sample(1)).await?;
    assert_eq!(
        second.get(),
        &SampleState {
            string_value: "hello".to_string(),
            int_value: 42,
            date_time_value: date,
            guid_value: guid,
        }
    );
    assert_eq!(second.slot().etag, written_revision);
    assert_eq!(store.document_count("SampleActor"), 1);
    Ok(())
}

#[tokio::test]
async fn sample_actor_clear_forgets_everything() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let host = Host::new(adapter(&store).await);

    let mut actor = host.activate::<SampleActor>(sample(2)).await?;
    actor.set("bye", 1, Utc::now(), Uuid::new_v4()).await?;
    actor.clear().await?;
    assert_eq!(actor.get(), &SampleState::default());

    let reactivated = host.activate::<SampleActor>(sample(2)).await?;
    assert_eq!(reactivated.get(), &SampleState::default());
    assert_eq!(reactivated.slot().etag, None);
    Ok(())
}

#[tokio::test]
async fn embedded_handles_address_the_same_actor() -> eyre::Result<()> {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let host = Host::new(adapter(&store).await);

    let mut owner = host.activate::<SampleActor>(sample(10)).await?;
    owner.set("owner", 10, Utc::now(), Uuid::new_v4()).await?;
    let member = host.activate::<SampleActor>(sample(11)).await?;

    let roster_ref = ActorReference::new("RosterActor", PrimaryKey::from("team one"))?;
    let mut roster = host.activate::<RosterActor>(roster_ref.clone()).await?;
    roster.state_mut().title = "team".to_string();
    roster.set_owner(owner.handle()).await?;
    roster.add_member(member.handle()).await?;
    roster.add_member(member.handle()).await?;
    drop(roster);

    let raw = store
        .raw_document("RosterActor", &key_mapper::document_key(&roster_ref))
        .expect("roster was written");
    assert_eq!(raw["state"]["owner"]["key"], "ActorReference=SampleActor/int:10");
    assert!(raw["state"]["owner"]["data"].is_string());
    assert_eq!(raw["state"]["members"].as_array().map(Vec::len), Some(1));

    let roster = host.activate::<RosterActor>(roster_ref).await?;
    let owner_handle: &ActorHandle<SampleActor> =
        roster.state().owner.as_ref().expect("owner was persisted");
    assert_eq!(owner_handle, &owner.handle());

    let resolved = host.activate_handle(owner_handle).await?;
    assert_eq!(resolved.get().string_value, "owner");
    Ok(())
}

#[tokio::test]
async fn closing_releases_the_store() {
    init_logging();
    let store = InMemoryDocumentStore::new();
    let host = Host::new(adapter(&store).await);
    let adapter = host.provider().clone();

    host.shutdown().await;
    assert!(store.is_closed());

    let mut slot = ActorState::<Profile>::default();
    let err = adapter
        .read_state("Player", &player("ada"), &mut slot)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::TransportFailure);
}
