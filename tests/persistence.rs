//! Persistence and recovery tests for the noema engine.
//!
//! These tests verify that learned concepts, association weights, domains
//! and the interaction log survive engine restart (persist + reopen cycle).

use noema::engine::{Engine, EngineConfig};
use noema::store::durable::DurableStore;

fn persistent_engine(dir: &std::path::Path) -> Engine {
    Engine::new(EngineConfig {
        data_dir: Some(dir.to_path_buf()),
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn learned_state_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    let (concepts_before, weight_before);
    // First session: learn something and persist.
    {
        let engine = persistent_engine(dir.path());
        assert!(engine.info().persistent);
        engine
            .process("How does energy conservation relate to calculus?")
            .unwrap();
        engine.process("How do neural networks learn?").unwrap();
        engine.persist().unwrap();

        concepts_before = engine
            .store()
            .domains()
            .get("computer_science")
            .unwrap()
            .concepts;
        weight_before = engine.store().association("mathematics", "physics").unwrap();
        assert!(weight_before > 0.8);
    }

    // Second session: reopen and verify.
    {
        let engine = persistent_engine(dir.path());
        let cs = engine.store().domains().get("computer_science").unwrap();
        assert_eq!(cs.concepts, concepts_before);
        assert!(cs.concepts.contains("neural networks"));
        assert_eq!(cs.interaction_count, 1);

        let weight_after = engine.store().association("mathematics", "physics").unwrap();
        assert!((weight_after - weight_before).abs() < 1e-12);

        assert_eq!(engine.store().log().len(), 2);
        assert_eq!(
            engine.recent_interactions(1)[0].query,
            "How do neural networks learn?"
        );
    }
}

#[test]
fn restored_store_is_not_reseeded() {
    let dir = tempfile::TempDir::new().unwrap();

    let domain_count;
    {
        let engine = persistent_engine(dir.path());
        for _ in 0..2 {
            engine.process("zorblax quintessence flumogen").unwrap();
        }
        assert!(engine.store().domains().contains("learned-zorblax-quintessence"));
        domain_count = engine.info().domain_count;
        assert_eq!(domain_count, 9);
        engine.persist().unwrap();
    }

    {
        let engine = persistent_engine(dir.path());
        assert_eq!(engine.info().domain_count, domain_count);
        assert!(engine.store().domains().contains("learned-zorblax-quintessence"));
        assert_eq!(engine.domains().last().unwrap().id, "learned-zorblax-quintessence");
    }
}

#[test]
fn background_flush_persists_without_explicit_save() {
    let dir = tempfile::TempDir::new().unwrap();

    {
        let engine = persistent_engine(dir.path());
        engine.process("What drives inflation in a market economy?").unwrap();
        // Dropping the engine drains the flush queue.
    }

    {
        let engine = persistent_engine(dir.path());
        assert_eq!(engine.store().log().len(), 1);
        let econ = engine.store().domains().get("economics").unwrap();
        assert_eq!(econ.interaction_count, 1);
    }
}

#[test]
fn corrupt_snapshot_starts_fresh_from_seed() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let durable = DurableStore::open(dir.path()).unwrap();
        durable.put(b"snapshot", b"definitely not bincode").unwrap();
    }

    let engine = persistent_engine(dir.path());
    assert_eq!(engine.info().domain_count, 8);
    assert!(engine.store().log().is_empty());
}

#[test]
fn memory_only_engine_persist_is_a_noop() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    assert!(!engine.info().persistent);
    engine.persist().unwrap();
}

#[test]
fn external_seed_pack_is_used_for_a_fresh_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let pack_dir = dir.path().join("seeds").join("tiny");
    std::fs::create_dir_all(&pack_dir).unwrap();
    std::fs::write(
        pack_dir.join("seed.toml"),
        r#"
[seed]
id = "tiny"
name = "Tiny"
version = "0.1.0"
description = "One domain"

[[domains]]
id = "astronomy"
name = "Astronomy"
weight = 0.9
patterns = ["star", "planet", "galaxy"]
concepts = ["stellar evolution", "exoplanet"]
"#,
    )
    .unwrap();

    let engine = Engine::new(EngineConfig {
        data_dir: Some(dir.path().to_path_buf()),
        seed_pack: Some("tiny".into()),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(engine.info().domain_count, 1);
    let outcome = engine.process("How are planet orbits shaped?").unwrap();
    assert!(outcome.activated_domains.iter().any(|a| a.id == "astronomy"));
}
