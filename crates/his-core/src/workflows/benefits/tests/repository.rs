use super::common::*;
use crate::workflows::benefits::domain::{
    AccountRole, CaseNumber, ContactUpdate, Gender, NewCaseWorkerAccount, NewChild, NewEducation,
    NewIncome, NewPlan, PlanId, TriggerId, TriggerStatus,
};
use crate::workflows::benefits::CaseError;

#[test]
fn duplicate_national_id_is_rejected_by_the_store() {
    let (service, _) = build_service();
    service
        .register_application(&applicant("NID-100", Gender::Male, "CA"))
        .expect("first registration");

    let mut again = applicant("NID-100", Gender::Female, "NV");
    again.full_name = "Someone Else".to_string();
    match service.register_application(&again) {
        Err(CaseError::DuplicateIdentity { field, value }) => {
            assert_eq!(field, "national id");
            assert_eq!(value, "NID-100");
        }
        other => panic!("expected duplicate identity, got {other:?}"),
    }
}

#[test]
fn opening_a_case_validates_its_references() {
    let (service, _) = build_service();
    let plan = seed_plan(&service, "SNAP", "SNAP Benefits 2024");
    let application = service
        .register_application(&applicant("NID-200", Gender::Female, "TX"))
        .expect("registered");

    assert!(matches!(
        service.open_case(crate::workflows::benefits::ApplicationId(999), plan.id),
        Err(CaseError::ApplicationNotFound(_))
    ));
    assert!(matches!(
        service.open_case(application.id, PlanId(999)),
        Err(CaseError::PlanNotFound(_))
    ));

    let case = service.open_case(application.id, plan.id).expect("opened");
    assert_eq!(case.application_id, application.id);
    assert!(matches!(
        service.open_case(application.id, plan.id),
        Err(CaseError::DuplicateCase { .. })
    ));

    service.set_plan_active(plan.id, false).expect("deactivate");
    let other = service
        .register_application(&applicant("NID-201", Gender::Male, "TX"))
        .expect("registered");
    assert!(matches!(
        service.open_case(other.id, plan.id),
        Err(CaseError::InvalidInput(_))
    ));
}

#[test]
fn one_applicant_may_hold_cases_on_several_plans() {
    let (service, _) = build_service();
    let snap = seed_plan(&service, "SNAP", "SNAP Benefits 2024");
    let medicaid = seed_plan(&service, "Medicaid", "Medicaid 2024");
    let application = service
        .register_application(&applicant("NID-210", Gender::Female, "TX"))
        .expect("registered");

    let first = service.open_case(application.id, snap.id).expect("snap case");
    let second = service
        .open_case(application.id, medicaid.id)
        .expect("medicaid case");
    assert!(second.case_number > first.case_number);
}

#[test]
fn facts_for_unknown_cases_fail_with_case_not_found() {
    let (service, _) = build_service();
    let missing = CaseNumber(4_040);

    let income = service.submit_income(
        missing,
        &NewIncome {
            employment_income: 10,
            property_income: 0,
        },
    );
    let child = service.submit_child(
        missing,
        &NewChild {
            date_of_birth: date(2019, 1, 1),
            national_id: None,
        },
    );
    let education = service.submit_education(
        missing,
        &NewEducation {
            qualification: "High school".to_string(),
            graduation_year: 2010,
        },
    );

    assert!(matches!(income, Err(CaseError::CaseNotFound(n)) if n == missing));
    assert!(matches!(child, Err(CaseError::CaseNotFound(n)) if n == missing));
    assert!(matches!(education, Err(CaseError::CaseNotFound(n)) if n == missing));

    let rows: i64 = service
        .database()
        .read(|conn| {
            Ok(conn.query_row(
                "SELECT (SELECT COUNT(*) FROM income_records)
                      + (SELECT COUNT(*) FROM child_records)
                      + (SELECT COUNT(*) FROM education_records)",
                [],
                |row| row.get(0),
            )?)
        })
        .expect("count");
    assert_eq!(rows, 0);
}

#[test]
fn invalid_fact_values_are_rejected() {
    let (service, _) = build_service();
    let plan = seed_plan(&service, "SNAP", "SNAP Benefits 2024");
    let case = open_case_for(&service, "NID-300", &plan);

    let negative = service.submit_income(
        case.case_number,
        &NewIncome {
            employment_income: -1,
            property_income: 0,
        },
    );
    assert!(matches!(negative, Err(CaseError::InvalidInput(_))));

    let ancient = service.submit_education(
        case.case_number,
        &NewEducation {
            qualification: "Diploma".to_string(),
            graduation_year: 1492,
        },
    );
    assert!(matches!(ancient, Err(CaseError::InvalidInput(_))));
}

#[test]
fn bundle_uses_latest_income_and_counts_children() {
    let (service, _) = build_service();
    let plan = seed_plan(&service, "CCAP", "CCAP Families 2024");
    let case = open_case_for(&service, "NID-400", &plan);

    for (employment, property) in [(90_000, 0), (120_000, 5_000)] {
        service
            .submit_income(
                case.case_number,
                &NewIncome {
                    employment_income: employment,
                    property_income: property,
                },
            )
            .expect("income");
    }
    for year in [2016, 2019] {
        service
            .submit_child(
                case.case_number,
                &NewChild {
                    date_of_birth: date(year, 7, 4),
                    national_id: Some(format!("CH-{year}")),
                },
            )
            .expect("child");
    }
    service
        .submit_education(
            case.case_number,
            &NewEducation {
                qualification: "Associate degree".to_string(),
                graduation_year: 2012,
            },
        )
        .expect("education");

    let bundle = service.case_bundle(case.case_number).expect("bundle");
    assert_eq!(bundle.total_income(), 125_000);
    assert_eq!(bundle.child_count(), 2);
    assert_eq!(bundle.category.name, "CCAP");
    assert_eq!(bundle.plan.name, "CCAP Families 2024");
    assert_eq!(
        bundle.education.map(|record| record.qualification),
        Some("Associate degree".to_string())
    );
    assert!(bundle.latest_decision.is_none());
    assert!(matches!(
        service.case_bundle(CaseNumber(77)),
        Err(CaseError::CaseNotFound(_))
    ));
}

#[test]
fn contact_updates_leave_identity_untouched() {
    let (service, _) = build_service();
    let application = service
        .register_application(&applicant("NID-500", Gender::Male, "wa"))
        .expect("registered");
    assert_eq!(application.state, "WA");

    let updated = service
        .update_application_contact(
            application.id,
            &ContactUpdate {
                email: Some("new@example.org".to_string()),
                phone: None,
            },
        )
        .expect("updated");
    assert_eq!(updated.email.as_deref(), Some("new@example.org"));
    assert_eq!(updated.phone, application.phone);
    assert_eq!(updated.national_id, "NID-500");

    assert!(matches!(
        service.update_application_contact(
            crate::workflows::benefits::ApplicationId(42),
            &ContactUpdate::default()
        ),
        Err(CaseError::ApplicationNotFound(_))
    ));
}

#[test]
fn marking_a_trigger_sent_is_idempotent() {
    let (service, _) = build_service();
    let plan = seed_plan(&service, "QHP", "Marketplace 2024");
    let case = open_case_for(&service, "NID-600", &plan);
    let run = service
        .run_eligibility_at(case.case_number, decision_time())
        .expect("run");

    let first = service.mark_trigger_sent(run.trigger.id).expect("sent");
    let second = service.mark_trigger_sent(run.trigger.id).expect("sent again");
    assert_eq!(first.status, TriggerStatus::Sent);
    assert_eq!(second.updated_at, first.updated_at);
    assert!(matches!(
        service.mark_trigger_sent(TriggerId(999)),
        Err(CaseError::TriggerNotFound(_))
    ));
}

#[test]
fn catalog_enforces_unique_accounts_and_valid_plans() {
    let (service, _) = build_service();
    let account = NewCaseWorkerAccount {
        full_name: "Morgan Hale".to_string(),
        email: "Morgan.Hale@agency.gov".to_string(),
        credential: "opaque-token".to_string(),
        phone: None,
        gender: Gender::Other,
        national_id: "STAFF-1".to_string(),
        date_of_birth: None,
        role: AccountRole::Admin,
    };
    let created = service.create_account(&account).expect("account");
    assert_eq!(created.email, "morgan.hale@agency.gov");
    assert_eq!(created.role, AccountRole::Admin);

    let same_email = NewCaseWorkerAccount {
        national_id: "STAFF-2".to_string(),
        email: "morgan.hale@AGENCY.gov".to_string(),
        ..account.clone()
    };
    assert!(matches!(
        service.create_account(&same_email),
        Err(CaseError::DuplicateIdentity { field, .. }) if field == "email"
    ));

    let caseworker = NewCaseWorkerAccount {
        email: "sam@agency.gov".to_string(),
        national_id: "STAFF-3".to_string(),
        role: AccountRole::Caseworker,
        ..account
    };
    service.create_account(&caseworker).expect("caseworker");
    assert_eq!(
        service
            .list_accounts(Some(AccountRole::Caseworker))
            .expect("list")
            .len(),
        1
    );
    assert_eq!(service.list_accounts(None).expect("list").len(), 2);

    let deactivated = service
        .set_account_active(created.id, false)
        .expect("deactivate");
    assert!(!deactivated.active);

    let category = service.create_category("SNAP").expect("category");
    assert!(matches!(
        service.create_category("SNAP"),
        Err(CaseError::DuplicateIdentity { .. })
    ));
    let backwards = NewPlan {
        name: "Backwards".to_string(),
        start_date: date(2024, 12, 31),
        end_date: date(2024, 1, 1),
        category_id: category.id,
    };
    assert!(matches!(
        service.create_plan(&backwards),
        Err(CaseError::InvalidInput(_))
    ));
    let orphan = NewPlan {
        category_id: crate::workflows::benefits::CategoryId(99),
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        ..backwards
    };
    assert!(matches!(
        service.create_plan(&orphan),
        Err(CaseError::CategoryNotFound(_))
    ));
}
