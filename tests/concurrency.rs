//! Concurrent access to a shared agency from many threads.

use std::sync::Arc;

use cognitive_agency::agency::Agency;
use cognitive_agency::agent::TaskHandle;
use cognitive_agency::atom::AtomType;
use cognitive_agency::config::AgencyConfig;
use cognitive_agency::rules::Rule;

#[test]
fn concurrent_allocation_respects_capacity() {
    let agency = Arc::new(Agency::init(AgencyConfig::with_max_atoms(50)).unwrap());
    let handles: Vec<_> = (0..100)
        .map(|i| {
            let agency = Arc::clone(&agency);
            std::thread::spawn(move || {
                agency
                    .atomspace()
                    .allocate(AtomType::Value, &format!("v{i}"))
                    .is_ok()
            })
        })
        .collect();
    let ok = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(ok, 50);
    assert_eq!(agency.atom_count(), 50);
}

#[test]
fn crossing_link_operations_do_not_deadlock() {
    let agency = Agency::init(AgencyConfig::with_max_atoms(10)).unwrap();
    let a = agency.atomspace().allocate(AtomType::Concept, "a").unwrap();
    let b = agency.atomspace().allocate(AtomType::Concept, "b").unwrap();

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..500 {
                    a.create_link(&b, 0, 0.5).unwrap();
                    a.remove_link(&b).unwrap();
                }
            });
            s.spawn(|| {
                for _ in 0..500 {
                    b.create_link(&a, 0, 0.5).unwrap();
                    b.remove_link(&a).unwrap();
                }
            });
        }
    });

    assert_eq!(a.count_links(), 0);
    assert_eq!(b.count_links(), 0);
    // agency + local
    assert_eq!(a.ref_count(), 2);
    assert_eq!(b.ref_count(), 2);
}

#[test]
fn concurrent_messaging_delivers_everything() {
    let agency = Arc::new(Agency::init(AgencyConfig::with_max_atoms(10)).unwrap());
    let inbox = agency.create_agent("inbox", TaskHandle(0)).unwrap();
    let content = agency
        .atomspace()
        .allocate(AtomType::Concept, "ping")
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let agency = Arc::clone(&agency);
            let inbox = Arc::clone(&inbox);
            let content = content.clone();
            std::thread::spawn(move || {
                let sender = agency
                    .create_agent(&format!("sender-{i}"), TaskHandle(i))
                    .unwrap();
                for _ in 0..25 {
                    agency.send(&sender, &inbox, &content);
                }
                sender.stats().messages_sent
            })
        })
        .collect();
    let sent: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(sent, 200);
    assert_eq!(agency.pending_messages(&inbox), 200);
    assert_eq!(inbox.stats().messages_processed, 200);
    let mut received = 0;
    while agency.receive(&inbox).is_some() {
        received += 1;
    }
    assert_eq!(received, 200);
    assert_eq!(agency.agent_count(), 9);
}

#[test]
fn concurrent_reasoning_on_separate_agents() {
    let agency = Arc::new(Agency::init(AgencyConfig::with_max_atoms(1000)).unwrap());
    let belief = agency
        .atomspace()
        .allocate(AtomType::Concept, "cpu_load")
        .unwrap();
    belief.set_truth(0.9, 0.8).unwrap();
    let rule = agency.add_rule(Rule::new("overload", AtomType::Concept, AtomType::Action, 0.7).unwrap());

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let agency = Arc::clone(&agency);
            let belief = belief.clone();
            std::thread::spawn(move || {
                let agent = agency
                    .create_agent(&format!("agent-{i}"), TaskHandle(i))
                    .unwrap();
                agent.add_belief(&belief);
                for _ in 0..5 {
                    assert!(agency.reason(&agent).unwrap().is_success());
                }
                agent.stats().knowledge
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 5);
    }

    assert_eq!(rule.times_applied(), 50);
    assert_eq!(agency.atom_count(), 51);
}
