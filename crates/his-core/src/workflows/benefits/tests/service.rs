use std::sync::Arc;

use super::common::*;
use crate::store::Database;
use crate::workflows::benefits::domain::{
    DecisionStatus, Gender, NewApplication, NewIncome, TriggerStatus,
};
use crate::workflows::benefits::{BenefitsService, CaseError, EligibilityPolicy};

fn count(service: &BenefitsService<MemoryDispatcher>, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    service
        .database()
        .read(|conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))
        .expect("count")
}

#[test]
fn run_eligibility_writes_one_decision_and_one_trigger() {
    let (service, _) = build_service();
    let plan = seed_plan(&service, "SNAP", "SNAP Benefits 2024");
    let application = service
        .register_application(&NewApplication {
            full_name: "Avery Quinn".to_string(),
            ..applicant("NID-700", Gender::Female, "TX")
        })
        .expect("registered");
    let case = service.open_case(application.id, plan.id).expect("case");
    service
        .submit_income(
            case.case_number,
            &NewIncome {
                employment_income: 150_000,
                property_income: 0,
            },
        )
        .expect("income");

    let run = service
        .run_eligibility_at(case.case_number, decision_time())
        .expect("eligibility");

    assert_eq!(run.decision.status, DecisionStatus::Approved);
    assert_eq!(run.decision.benefit_amount, 5_000);
    assert_eq!(run.decision.decided_at, decision_time());
    assert_eq!(run.trigger.decision_id, run.decision.id);
    assert_eq!(run.trigger.status, TriggerStatus::Pending);
    assert!(run.trigger.notice.contains("Avery Quinn"));
    assert!(run.trigger.notice.contains("SNAP"));
    assert_eq!(count(&service, "eligibility_decisions"), 1);
    assert_eq!(count(&service, "correspondence_triggers"), 1);

    let bundle = service.case_bundle(case.case_number).expect("bundle");
    assert_eq!(bundle.latest_decision, Some(run.decision));
}

#[test]
fn rerunning_appends_a_new_current_decision() {
    let (service, _) = build_service();
    let plan = seed_plan(&service, "Medicaid", "Medicaid 2024");
    let case = open_case_for(&service, "NID-710", &plan);
    service
        .submit_income(
            case.case_number,
            &NewIncome {
                employment_income: 300_000,
                property_income: 0,
            },
        )
        .expect("income");
    let denied = service
        .run_eligibility_at(case.case_number, decision_time())
        .expect("first run");
    assert_eq!(denied.decision.status, DecisionStatus::Denied);

    service
        .submit_income(
            case.case_number,
            &NewIncome {
                employment_income: 100_000,
                property_income: 0,
            },
        )
        .expect("corrected income");
    let approved = service
        .run_eligibility_at(case.case_number, decision_time())
        .expect("second run");

    let history = service.decision_history(case.case_number).expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, DecisionStatus::Denied);
    let bundle = service.case_bundle(case.case_number).expect("bundle");
    assert_eq!(bundle.current_status(), DecisionStatus::Approved);
    assert_eq!(bundle.latest_decision.map(|d| d.id), Some(approved.decision.id));
}

#[test]
fn strict_policy_blocks_income_tested_cases_without_income() {
    let (service, _) = build_service_with(EligibilityPolicy::strict());
    let plan = seed_plan(&service, "SNAP", "SNAP Benefits 2024");
    let case = open_case_for(&service, "NID-720", &plan);

    match service.run_eligibility(case.case_number) {
        Err(CaseError::IncompleteFacts {
            case_number,
            missing,
        }) => {
            assert_eq!(case_number, case.case_number);
            assert_eq!(missing, "income record");
        }
        other => panic!("expected incomplete facts, got {other:?}"),
    }
    assert_eq!(count(&service, "eligibility_decisions"), 0);
}

#[test]
fn reconcile_completes_a_trigger_lost_after_the_decision_write() {
    let (service, _) = build_service();
    let plan = seed_plan(&service, "SNAP", "SNAP Benefits 2024");
    let case = open_case_for(&service, "NID-730", &plan);

    // Decision row without its trigger, as left by a crash between the two writes.
    service
        .database()
        .with_conn(|conn| {
            conn.execute(
                "INSERT INTO eligibility_decisions
                    (case_number, plan_name, status, validity_start, validity_end,
                     benefit_amount, denial_reason, decided_at)
                 VALUES (?1, 'SNAP Benefits 2024', 'APPROVED', '2024-06-01', '2025-05-31',
                         5000, NULL, '2024-06-01T09:30:00.000000Z')",
                [case.case_number.0],
            )?;
            Ok::<_, crate::store::StoreError>(())
        })
        .expect("raw decision");

    assert!(matches!(
        service.verify_integrity(),
        Err(CaseError::InvariantViolation(_))
    ));

    let report = service.reconcile().expect("reconcile");
    assert_eq!(report.decisions_checked, 1);
    assert_eq!(report.triggers_completed.len(), 1);
    assert_eq!(count(&service, "correspondence_triggers"), 1);
    service.verify_integrity().expect("consistent after repair");

    let pending = service.cases().pending_triggers(None).expect("pending");
    assert!(pending[0].notice.contains("Applicant NID-730"));

    let again = service.reconcile().expect("second pass");
    assert_eq!(again.decisions_checked, 0);
    assert!(again.triggers_completed.is_empty());
}

#[test]
fn reconcile_refuses_cases_without_an_application() {
    let (service, _) = build_service();
    let plan = seed_plan(&service, "SNAP", "SNAP Benefits 2024");

    service
        .database()
        .with_conn(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
            conn.execute(
                "INSERT INTO cases (application_id, plan_id, created_at)
                 VALUES (5150, ?1, '2024-01-01T00:00:00.000000Z')",
                [plan.id.0],
            )?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok::<_, crate::store::StoreError>(())
        })
        .expect("legacy row");

    assert!(matches!(
        service.reconcile(),
        Err(CaseError::InvariantViolation(message)) if message.contains("without an application")
    ));
    assert!(matches!(
        service.verify_integrity(),
        Err(CaseError::InvariantViolation(_))
    ));
}

#[test]
fn dispatch_marks_delivered_triggers_sent() {
    let (service, dispatcher) = build_service();
    let plan = seed_plan(&service, "QHP", "Marketplace 2024");
    for national_id in ["NID-740", "NID-741"] {
        let case = open_case_for(&service, national_id, &plan);
        service
            .run_eligibility_at(case.case_number, decision_time())
            .expect("run");
    }

    let summary = service.dispatch_pending(None).expect("dispatch");
    assert_eq!(summary.sent.len(), 2);
    assert!(summary.failed.is_empty());
    assert_eq!(dispatcher.delivered().len(), 2);
    assert!(service
        .cases()
        .pending_triggers(None)
        .expect("pending")
        .is_empty());
}

#[test]
fn failed_dispatch_leaves_triggers_pending() {
    let db = Database::in_memory().expect("database");
    let service = BenefitsService::new(db, Arc::new(OfflineDispatcher), EligibilityPolicy::default());
    let plan = seed_plan(&service, "QHP", "Marketplace 2024");
    let case = open_case_for(&service, "NID-750", &plan);
    let run = service
        .run_eligibility_at(case.case_number, decision_time())
        .expect("run");

    let summary = service.dispatch_pending(Some(10)).expect("dispatch");
    assert!(summary.sent.is_empty());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].trigger_id, run.trigger.id);
    assert!(summary.failed[0].error.contains("mail relay offline"));
    assert_eq!(
        service.cases().trigger(run.trigger.id).expect("trigger").status,
        TriggerStatus::Pending
    );
}

#[test]
fn failed_trigger_insert_rolls_back_the_decision() {
    let (service, _) = build_service();
    let plan = seed_plan(&service, "SNAP", "SNAP Benefits 2024");
    let case = open_case_for(&service, "NID-760", &plan);

    service
        .database()
        .with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_notices BEFORE INSERT ON correspondence_triggers
                 BEGIN SELECT RAISE(ABORT, 'notice queue rejected'); END;",
            )?;
            Ok::<_, crate::store::StoreError>(())
        })
        .expect("install trigger");

    let result = service.run_eligibility_at(case.case_number, decision_time());
    assert!(result.is_err(), "run should fail, got {result:?}");
    assert_eq!(count(&service, "eligibility_decisions"), 0);
    assert_eq!(count(&service, "correspondence_triggers"), 0);
    assert!(service
        .decision_history(case.case_number)
        .expect("history")
        .is_empty());
}

#[test]
fn unmarked_delivery_is_reported_without_aborting_the_pass() {
    let (service, dispatcher) = build_service();
    let plan = seed_plan(&service, "QHP", "Marketplace 2024");
    let stuck = open_case_for(&service, "NID-770", &plan);
    let stuck_run = service
        .run_eligibility_at(stuck.case_number, decision_time())
        .expect("run");
    let healthy = open_case_for(&service, "NID-771", &plan);
    let healthy_run = service
        .run_eligibility_at(healthy.case_number, decision_time())
        .expect("run");

    let sql = format!(
        "CREATE TRIGGER freeze_trigger BEFORE UPDATE ON correspondence_triggers
         WHEN OLD.id = {} BEGIN SELECT RAISE(ABORT, 'row frozen'); END;",
        stuck_run.trigger.id.0
    );
    service
        .database()
        .with_conn(|conn| {
            conn.execute_batch(&sql)?;
            Ok::<_, crate::store::StoreError>(())
        })
        .expect("install trigger");

    let summary = service.dispatch_pending(None).expect("dispatch pass completes");
    assert_eq!(dispatcher.delivered().len(), 2);
    assert_eq!(summary.sent, vec![healthy_run.trigger.id]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].trigger_id, stuck_run.trigger.id);
    assert!(summary.failed[0].error.contains("not marked sent"));
    assert_eq!(
        service
            .cases()
            .trigger(stuck_run.trigger.id)
            .expect("trigger")
            .status,
        TriggerStatus::Pending
    );
}

#[test]
fn applications_without_cases_are_listed_newest_first() {
    let (service, _) = build_service();
    let plan = seed_plan(&service, "SNAP", "SNAP Benefits 2024");
    open_case_for(&service, "NID-780", &plan);
    for national_id in ["NID-781", "NID-782"] {
        service
            .register_application(&applicant(national_id, Gender::Male, "NM"))
            .expect("registered");
    }

    let all = service.list_applications(None, 0).expect("listing");
    let ids: Vec<&str> = all.iter().map(|app| app.national_id.as_str()).collect();
    assert_eq!(ids, ["NID-782", "NID-781", "NID-780"]);

    let page = service.list_applications(Some(1), 1).expect("page");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].national_id, "NID-781");
    assert!(service
        .list_applications(Some(5), 3)
        .expect("past the end")
        .is_empty());
}

#[test]
fn category_and_plan_activation_round_through_the_service() {
    let (service, _) = build_service();
    let plan = seed_plan(&service, "CCAP", "Child Care 2024");

    let category = service
        .set_category_active(plan.category_id, false)
        .expect("deactivate category");
    assert!(!category.active);
    let plan = service.set_plan_active(plan.id, false).expect("deactivate plan");
    assert!(!plan.active);
    assert!(service.list_plans(true).expect("active plans").is_empty());

    let application = service
        .register_application(&applicant("NID-790", Gender::Other, "WA"))
        .expect("registered");
    assert!(matches!(
        service.open_case(application.id, plan.id),
        Err(CaseError::InvalidInput(_))
    ));

    assert!(matches!(
        service.set_category_active(crate::workflows::benefits::CategoryId(404), true),
        Err(CaseError::CategoryNotFound(_))
    ));
}
