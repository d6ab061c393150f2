use super::common::*;
use crate::workflows::benefits::domain::{DecisionStatus, Gender, NewIncome};
use crate::workflows::benefits::reporting::NOTICE_PREVIEW_CHARS;
use crate::workflows::benefits::{CaseStatusFilter, ReportKind};

#[test]
fn case_status_defaults_to_pending_and_lists_newest_first() {
    let (service, _) = build_service();
    let snap = seed_plan(&service, "SNAP", "SNAP Benefits 2024");
    let first = open_case_for(&service, "NID-800", &snap);
    let second = open_case_for(&service, "NID-801", &snap);
    service
        .submit_income(
            first.case_number,
            &NewIncome {
                employment_income: 1_000,
                property_income: 0,
            },
        )
        .expect("income");
    service
        .run_eligibility_at(first.case_number, decision_time())
        .expect("run");

    let rows = service
        .case_status_report(&CaseStatusFilter::default())
        .expect("report");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].case_number, second.case_number);
    assert_eq!(rows[0].status, DecisionStatus::Pending);
    assert_eq!(rows[0].benefit_amount, 0);
    assert_eq!(rows[0].decided_at, None);
    assert_eq!(rows[1].status, DecisionStatus::Approved);
    assert_eq!(rows[1].benefit_amount, 5_000);
    assert_eq!(rows[1].decided_at, Some(decision_time()));
    assert_eq!(rows[1].plan, "SNAP Benefits 2024");
}

#[test]
fn case_status_filters_and_paginates() {
    let (service, _) = build_service();
    let qhp = seed_plan(&service, "QHP", "Marketplace 2024");
    for (index, state) in ["TX", "OH", "TX"].iter().enumerate() {
        let application = service
            .register_application(&applicant(&format!("NID-81{index}"), Gender::Male, state))
            .expect("registered");
        let case = service.open_case(application.id, qhp.id).expect("case");
        if index == 0 {
            service
                .run_eligibility_at(case.case_number, decision_time())
                .expect("run");
        }
    }

    let texas = service
        .case_status_report(&CaseStatusFilter {
            state: Some("tx".to_string()),
            ..CaseStatusFilter::default()
        })
        .expect("texas");
    assert_eq!(texas.len(), 2);

    let purchase = service
        .case_status_report(&CaseStatusFilter {
            status: Some(DecisionStatus::PurchaseRequired),
            ..CaseStatusFilter::default()
        })
        .expect("purchase");
    assert_eq!(purchase.len(), 1);

    let pending = service
        .case_status_report(&CaseStatusFilter {
            status: Some(DecisionStatus::Pending),
            ..CaseStatusFilter::default()
        })
        .expect("pending");
    assert_eq!(pending.len(), 2);

    let page = service
        .case_status_report(&CaseStatusFilter {
            limit: Some(1),
            offset: 1,
            ..CaseStatusFilter::default()
        })
        .expect("page");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].state, "OH");
}

#[test]
fn demographics_group_by_state_with_gender_breakdown() {
    let (service, _) = build_service();
    let people = [
        ("NID-820", Gender::Female, "TX"),
        ("NID-821", Gender::Male, "TX"),
        ("NID-822", Gender::Female, "TX"),
        ("NID-823", Gender::Other, "AZ"),
    ];
    for (national_id, gender, state) in people {
        service
            .register_application(&applicant(national_id, gender, state))
            .expect("registered");
    }

    let rows = service.state_demographics_report().expect("report");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].state, "AZ");
    assert_eq!((rows[0].total, rows[0].other), (1, 1));
    assert_eq!(rows[1].state, "TX");
    assert_eq!(
        (rows[1].total, rows[1].male, rows[1].female, rows[1].other),
        (3, 1, 2, 0)
    );
}

#[test]
fn pending_triggers_are_previewed_and_exclude_sent_ones() {
    let (service, _) = build_service();
    let qhp = seed_plan(&service, "QHP", "Marketplace 2024");
    let mut triggers = Vec::new();
    for national_id in ["NID-830", "NID-831"] {
        let case = open_case_for(&service, national_id, &qhp);
        let run = service
            .run_eligibility(case.case_number)
            .expect("run");
        triggers.push(run.trigger);
    }
    service
        .mark_trigger_sent(triggers[0].id)
        .expect("sent");

    let rows = service.pending_trigger_report(None).expect("report");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].trigger_id, triggers[1].id);
    assert_eq!(rows[0].applicant.as_deref(), Some("Applicant NID-831"));
    assert!(triggers[1].notice.chars().count() > NOTICE_PREVIEW_CHARS);
    assert_eq!(rows[0].notice_preview.chars().count(), NOTICE_PREVIEW_CHARS);
    assert!(triggers[1].notice.starts_with(&rows[0].notice_preview));
}

#[test]
fn reports_export_as_csv() {
    let (service, _) = build_service();
    service
        .register_application(&applicant("NID-840", Gender::Female, "NM"))
        .expect("registered");

    let csv = service
        .reports()
        .export_csv(ReportKind::StateDemographics, &CaseStatusFilter::default())
        .expect("csv");
    assert_eq!(csv, "state,total,male,female,other\nNM,1,0,1,0\n");

    assert_eq!("pending-triggers".parse(), Ok(ReportKind::PendingTriggers));
    assert!("ledger".parse::<ReportKind>().is_err());
}
