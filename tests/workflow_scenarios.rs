//! Review workflow scenarios across the state machine and its collaborators
//!
//! Run with: `cargo test --test workflow_scenarios`

mod common;

use accession::config::WorkflowSettings;
use accession::notify::Template;
use accession::workflow::{
    AdvanceOptions, WorkflowError, WorkflowItem, WorkflowState, WorkflowStore,
};
use common::Repository;

// === Scenario: every pool empty, start archives in one call ===

#[test]
fn empty_pools_archive_on_start() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let submitter = repo.actor("Sam Submitter");
    let draft = repo.draft("On Rivers", Some(&submitter));

    let item = machine.start(draft.clone()).unwrap();

    assert_eq!(item.state, WorkflowState::Archive);
    let entity = repo.content.get(&draft.item).unwrap();
    assert!(entity.status.archived);
    assert!(entity.parents.contains(&repo.collection));
    assert!(repo.workflow.find_item(&item.id).unwrap().is_none());
    assert!(repo.workflow.find_draft(&draft.id).unwrap().is_none());

    let events = repo.log.events();
    let transitions: Vec<(&str, &str, bool)> = events
        .iter()
        .map(|e| (e.old_state.as_str(), e.new_state.as_str(), e.skipped))
        .collect();
    assert_eq!(
        transitions,
        vec![
            ("SUBMIT", "STEP1POOL", true),
            ("STEP1", "STEP2POOL", true),
            ("STEP2", "STEP3POOL", true),
            ("STEP3", "ARCHIVE", false),
        ]
    );
    assert!(events.iter().all(|e| e.owner.is_none()));
}

#[test]
fn skip_ahead_records_no_approvals() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let draft = repo.draft("On Rivers", None);

    machine.start(draft.clone()).unwrap();

    let provenance = repo.provenance(&draft.item);
    assert_eq!(provenance.len(), 1);
    assert!(provenance[0].starts_with("Submitted by unknown (probably automated)"));
}

#[test]
fn archive_notifies_submitter_with_handle_link() {
    let repo = Repository::new();
    let machine = repo.machine(1);
    let submitter = repo.actor("Sam Submitter");
    let draft = repo.draft("On Rivers", Some(&submitter));

    machine.start(draft).unwrap();

    let sent = repo.notifier.sent_with(Template::SubmitArchive);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipients, vec![submitter.email.clone()]);
    assert_eq!(sent[0].args[0], "On Rivers");
    assert_eq!(sent[0].args[1], "Theses");
}

// === Scenario: an empty middle pool is passed through ===

#[test]
fn empty_middle_pool_matches_claim_and_advance() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let first = repo.reviewers(1, &["Ada One"]);
    let third = repo.reviewers(3, &["Cy Three", "Di Three"]);
    let draft = repo.draft("On Rivers", None);

    let mut item = machine.start(draft.clone()).unwrap();
    machine.claim(&mut item, &first[0]).unwrap();
    let archived = machine.advance(&mut item, Some(&first[0])).unwrap();

    assert!(!archived);
    assert_eq!(item.state, WorkflowState::Pool(3));
    assert_eq!(item.owner, None);
    let tasks = repo.workflow.tasks_for_item(&item.id).unwrap();
    let mut holders: Vec<_> = tasks.iter().map(|t| t.actor).collect();
    holders.sort_by_key(|a| a.to_string());
    let mut expected: Vec<_> = third.iter().map(|a| a.id).collect();
    expected.sort_by_key(|a| a.to_string());
    assert_eq!(holders, expected);

    // submission plus the step 1 approval; nothing for the skipped step 2
    let provenance = repo.provenance(&draft.item);
    assert_eq!(provenance.len(), 2);
    assert!(provenance[1].starts_with("Approved for entry into archive by Ada One (ada.one@example.org)"));

    let skipped: Vec<String> = repo
        .log
        .events()
        .into_iter()
        .filter(|e| e.skipped)
        .map(|e| e.new_state)
        .collect();
    assert_eq!(skipped, vec!["STEP2POOL".to_string()]);
}

// === Scenario: linear approval from SUBMIT ===

#[test]
fn advancing_walks_every_state_in_order() {
    let repo = Repository::new();
    let steps = 3u8;
    let machine = repo.machine(steps);
    let states = machine.states();
    let reviewer = repo.actor("Ada Reviewer");
    for step in 1..=steps {
        let group = accession::identity::Group::new(format!("step {}", step)).with_member(reviewer.id);
        let group = repo.directory.add_group(group);
        repo.directory.assign_step_group(repo.collection, step, group);
    }

    let draft = repo.draft("On Rivers", None);
    let mut item = WorkflowItem::from_draft(&draft);
    repo.workflow.insert_item(&item).unwrap();

    let mut calls = 0;
    let mut archived = false;
    while !archived {
        let before = states.id(item.state);
        archived = machine
            .advance_with(&mut item, Some(&reviewer), AdvanceOptions::without_curation())
            .unwrap();
        calls += 1;
        assert_eq!(states.id(item.state), before + 1, "advance skipped a state");
        assert!(calls <= 2 * steps as usize + 1);
    }
    assert_eq!(calls, 2 * steps as usize + 1);
    assert_eq!(item.state, WorkflowState::Archive);

    // approvals for steps 1 and 2; the editorial step records nothing
    let approvals = repo
        .provenance(&draft.item)
        .into_iter()
        .filter(|p| p.starts_with("Approved"))
        .count();
    assert_eq!(approvals, 2);
}

#[test]
fn pool_entry_notifies_each_member() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let submitter = repo.actor("Sam Submitter");
    let reviewers = repo.reviewers(1, &["Ada One", "Bo One"]);
    let draft = repo.draft("On Rivers", Some(&submitter));

    machine.start(draft).unwrap();

    let sent = repo.notifier.sent_with(Template::SubmitTask);
    assert_eq!(sent.len(), 2);
    let recipients: Vec<String> = sent.iter().flat_map(|n| n.recipients.clone()).collect();
    for reviewer in &reviewers {
        assert!(recipients.contains(&reviewer.email));
    }
    assert_eq!(sent[0].args[2], "Sam Submitter");
    assert!(sent[0].args[3].contains("checked before inclusion"));
    assert_eq!(sent[0].args[4], "https://repo.example.org/mydspace");
}

#[test]
fn start_without_notify_suppresses_only_the_first_announcement() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let reviewers = repo.reviewers(1, &["Ada One"]);
    let draft = repo.draft("On Rivers", None);

    let mut item = machine.start_without_notify(draft).unwrap();
    assert_eq!(item.state, WorkflowState::Pool(1));
    assert_eq!(repo.workflow.tasks_for_item(&item.id).unwrap().len(), 1);
    assert!(repo.notifier.sent_with(Template::SubmitTask).is_empty());

    machine.claim(&mut item, &reviewers[0]).unwrap();
    machine.unclaim(&mut item, &reviewers[0]).unwrap();
    assert_eq!(repo.notifier.sent_with(Template::SubmitTask).len(), 1);
}

#[test]
fn returned_tasks_can_stay_quiet() {
    let repo = Repository::new();
    let machine = repo.machine_with(WorkflowSettings {
        notify_returned_tasks: false,
        ..WorkflowSettings::default()
    });
    let reviewers = repo.reviewers(1, &["Ada One"]);
    let mut item = machine.start(repo.draft("On Rivers", None)).unwrap();
    assert_eq!(repo.notifier.sent_with(Template::SubmitTask).len(), 1);

    machine.claim(&mut item, &reviewers[0]).unwrap();
    machine.unclaim(&mut item, &reviewers[0]).unwrap();

    assert_eq!(item.state, WorkflowState::Pool(1));
    assert_eq!(repo.workflow.tasks_for_item(&item.id).unwrap().len(), 1);
    assert_eq!(repo.notifier.sent_with(Template::SubmitTask).len(), 1);
}

#[test]
fn notification_failure_does_not_roll_back() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    repo.reviewers(1, &["Ada One"]);
    repo.notifier.fail_deliveries();

    let item = machine.start(repo.draft("On Rivers", None)).unwrap();

    assert_eq!(item.state, WorkflowState::Pool(1));
    assert_eq!(repo.notifier.sent().len(), 1);
    let stored = repo.workflow.find_item(&item.id).unwrap().unwrap();
    assert_eq!(stored.state, WorkflowState::Pool(1));
}

// === Scenario: claim on a claimed step is ignored ===

#[test]
fn claim_on_claimed_step_changes_nothing() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let first = repo.reviewers(1, &["Ada One"]);
    let second = repo.reviewers(2, &["Bo Two"]);

    let mut item = machine.start(repo.draft("On Rivers", None)).unwrap();
    machine.advance(&mut item, Some(&first[0])).unwrap();
    machine.advance(&mut item, Some(&first[0])).unwrap();
    machine.claim(&mut item, &second[0]).unwrap();
    assert_eq!(item.state, WorkflowState::Claimed(2));
    let before = item.clone();
    let events = repo.log.events().len();

    machine.claim(&mut item, &second[0]).unwrap();

    assert_eq!(item, before);
    assert_eq!(repo.log.events().len(), events);
    assert_eq!(
        repo.workflow.find_item(&item.id).unwrap().unwrap().version,
        before.version
    );
}

#[test]
fn unclaim_in_a_pool_changes_nothing() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let reviewers = repo.reviewers(1, &["Ada One"]);

    let mut item = machine.start(repo.draft("On Rivers", None)).unwrap();
    assert_eq!(item.state, WorkflowState::Pool(1));
    let before = item.clone();
    let events = repo.log.events().len();
    let tasks = machine.pooled_tasks(&reviewers[0]).unwrap().len();

    machine.unclaim(&mut item, &reviewers[0]).unwrap();

    assert_eq!(item, before);
    assert_eq!(repo.log.events().len(), events);
    assert_eq!(machine.pooled_tasks(&reviewers[0]).unwrap().len(), tasks);
    assert_eq!(
        repo.workflow.find_item(&item.id).unwrap().unwrap().version,
        before.version
    );
}

#[test]
fn claiming_sets_owner_and_clears_pool() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let reviewers = repo.reviewers(1, &["Ada One", "Bo One"]);
    let mut item = machine.start(repo.draft("On Rivers", None)).unwrap();
    assert_eq!(machine.pooled_tasks(&reviewers[1]).unwrap().len(), 1);

    machine.claim(&mut item, &reviewers[0]).unwrap();

    assert_eq!(item.owner, Some(reviewers[0].id));
    assert!(repo.workflow.tasks_for_item(&item.id).unwrap().is_empty());
    assert!(machine.pooled_tasks(&reviewers[1]).unwrap().is_empty());
    let owned = machine.owned_tasks(&reviewers[0]).unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].id, item.id);
    let last = repo.log.events().pop().unwrap();
    assert_eq!(last.new_state, "STEP1");
    assert_eq!(last.owner, Some(reviewers[0].id));
}

// === Scenario: rejection returns the draft to its submitter ===

fn assert_returned_to_draft(repo: &Repository, item: &WorkflowItem, submitter: &accession::identity::Actor) {
    assert!(repo.workflow.find_item(&item.id).unwrap().is_none());
    assert!(repo.workflow.tasks_for_item(&item.id).unwrap().is_empty());
    let drafts = repo.workflow.drafts_submitted_by(&submitter.id).unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].item, item.item);
    assert_eq!(drafts[0].collection, item.collection);
    let last = repo.log.events().pop().unwrap();
    assert_eq!(last.new_state, "SUBMIT");
}

#[test]
fn reject_from_pool() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let submitter = repo.actor("Sam Submitter");
    let reviewers = repo.reviewers(1, &["Ada One", "Bo One"]);
    let item = machine.start(repo.draft("On Rivers", Some(&submitter))).unwrap();

    machine
        .reject(item.clone(), Some(&reviewers[0]), "missing abstract")
        .unwrap();

    assert_returned_to_draft(&repo, &item, &submitter);
    let sent = repo.notifier.sent_with(Template::SubmitReject);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipients, vec![submitter.email.clone()]);
    assert_eq!(sent[0].args[2], "Ada One");
    assert_eq!(sent[0].args[3], "missing abstract");
    let provenance = repo.provenance(&item.item);
    assert!(provenance
        .last()
        .unwrap()
        .starts_with("Rejected by Ada One (ada.one@example.org), reason: missing abstract on "));
}

#[test]
fn reject_from_claimed_step() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let submitter = repo.actor("Sam Submitter");
    let reviewers = repo.reviewers(1, &["Ada One"]);
    let mut item = machine.start(repo.draft("On Rivers", Some(&submitter))).unwrap();
    machine.claim(&mut item, &reviewers[0]).unwrap();

    machine.reject(item.clone(), Some(&reviewers[0]), "wrong collection").unwrap();

    assert_returned_to_draft(&repo, &item, &submitter);
}

#[test]
fn reject_from_submit() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let submitter = repo.actor("Sam Submitter");
    let draft = repo.draft("On Rivers", Some(&submitter));
    repo.workflow.delete_draft(&draft.id).unwrap();
    let item = WorkflowItem::from_draft(&draft);
    repo.workflow.insert_item(&item).unwrap();

    machine.reject(item.clone(), None, "duplicate").unwrap();

    assert_returned_to_draft(&repo, &item, &submitter);
}

#[test]
fn outsider_cannot_reject() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    repo.reviewers(1, &["Ada One"]);
    let outsider = repo.actor("Eve Outsider");
    let item = machine.start(repo.draft("On Rivers", None)).unwrap();

    let err = machine.reject(item.clone(), Some(&outsider), "spite").unwrap_err();

    assert!(matches!(err, WorkflowError::NotAuthorized(_)));
    assert!(repo.workflow.find_item(&item.id).unwrap().is_some());
}

// === Scenario: abort is for administrators ===

#[test]
fn abort_requires_admin() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let submitter = repo.actor("Sam Submitter");
    let reviewers = repo.reviewers(1, &["Ada One"]);
    let item = machine.start(repo.draft("On Rivers", Some(&submitter))).unwrap();
    let events = repo.log.events().len();

    let err = machine.abort(item.clone(), &reviewers[0]).unwrap_err();
    assert!(matches!(err, WorkflowError::NotAuthorized(_)));
    assert_eq!(repo.workflow.find_item(&item.id).unwrap().unwrap(), item);
    assert_eq!(repo.log.events().len(), events);

    let admin = repo.admin("Root Admin");
    machine.abort(item.clone(), &admin).unwrap();
    assert_returned_to_draft(&repo, &item, &submitter);
    assert!(repo.notifier.sent_with(Template::SubmitReject).is_empty());
}

// === Scenario: concurrent transitions on one item ===

#[test]
fn stale_copy_loses_the_race() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let reviewers = repo.reviewers(1, &["Ada One", "Bo One"]);
    let item = machine.start(repo.draft("On Rivers", None)).unwrap();
    let mut first = item.clone();
    let mut second = item.clone();

    machine.claim(&mut first, &reviewers[0]).unwrap();
    let err = machine.claim(&mut second, &reviewers[1]).unwrap_err();

    assert!(matches!(err, WorkflowError::ConcurrentModification(_)));
    // the losing copy keeps what it had
    assert_eq!(second, item);
    let stored = repo.workflow.find_item(&item.id).unwrap().unwrap();
    assert_eq!(stored.owner, Some(reviewers[0].id));
}

#[test]
fn stale_reject_after_archive_fails() {
    let repo = Repository::new();
    let machine = repo.machine(1);
    let reviewers = repo.reviewers(1, &["Ada One"]);
    let mut item = machine.start(repo.draft("On Rivers", None)).unwrap();
    let stale = item.clone();

    machine.advance(&mut item, Some(&reviewers[0])).unwrap();
    assert!(machine.advance(&mut item, Some(&reviewers[0])).unwrap());

    let err = machine.reject(stale, Some(&reviewers[0]), "too late").unwrap_err();
    assert!(matches!(err, WorkflowError::ItemNotFound(_)));
}

#[test]
fn actor_delete_constraints() {
    let repo = Repository::new();
    let machine = repo.machine(3);
    let submitter = repo.actor("Sam Submitter");
    let reviewers = repo.reviewers(1, &["Ada One"]);
    let bystander = repo.actor("Bea Bystander");
    machine.start(repo.draft("On Rivers", Some(&submitter))).unwrap();

    assert_eq!(machine.delete_constraints(&submitter).unwrap(), vec!["workflowitem"]);
    assert_eq!(machine.delete_constraints(&reviewers[0]).unwrap(), vec!["tasklistitem"]);
    assert!(machine.delete_constraints(&bystander).unwrap().is_empty());
}
