use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::store::Database;
use crate::workflows::benefits::domain::{
    ApplicationId, BenefitCase, CaseBundle, CaseNumber, CategoryId, ChildRecord,
    CitizenApplication, CorrespondenceTrigger, Gender, IncomeRecord, NewApplication, NewPlan,
    Plan, PlanCategory, PlanId,
};
use crate::workflows::benefits::outbox::{DispatchError, NoticeDispatcher};
use crate::workflows::benefits::{BenefitsService, EligibilityPolicy};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn decision_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn as_of() -> NaiveDate {
    decision_time().date_naive()
}

#[derive(Default, Clone)]
pub(super) struct MemoryDispatcher {
    delivered: Arc<Mutex<Vec<CorrespondenceTrigger>>>,
}

impl MemoryDispatcher {
    pub(super) fn delivered(&self) -> Vec<CorrespondenceTrigger> {
        self.delivered.lock().expect("dispatcher mutex poisoned").clone()
    }
}

impl NoticeDispatcher for MemoryDispatcher {
    fn dispatch(&self, trigger: &CorrespondenceTrigger) -> Result<(), DispatchError> {
        self.delivered
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(trigger.clone());
        Ok(())
    }
}

pub(super) struct OfflineDispatcher;

impl NoticeDispatcher for OfflineDispatcher {
    fn dispatch(&self, _trigger: &CorrespondenceTrigger) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("mail relay offline".to_string()))
    }
}

pub(super) fn build_service() -> (BenefitsService<MemoryDispatcher>, Arc<MemoryDispatcher>) {
    build_service_with(EligibilityPolicy::default())
}

pub(super) fn build_service_with(
    policy: EligibilityPolicy,
) -> (BenefitsService<MemoryDispatcher>, Arc<MemoryDispatcher>) {
    let db = Database::in_memory().expect("in-memory database");
    let dispatcher = Arc::new(MemoryDispatcher::default());
    let service = BenefitsService::new(db, dispatcher.clone(), policy);
    (service, dispatcher)
}

pub(super) fn seed_plan<D: NoticeDispatcher + 'static>(
    service: &BenefitsService<D>,
    category: &str,
    plan_name: &str,
) -> Plan {
    let category = service
        .create_category(category)
        .expect("category created");
    service
        .create_plan(&NewPlan {
            name: plan_name.to_string(),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 12, 31),
            category_id: category.id,
        })
        .expect("plan created")
}

pub(super) fn applicant(national_id: &str, gender: Gender, state: &str) -> NewApplication {
    NewApplication {
        full_name: format!("Applicant {national_id}"),
        email: Some(format!("{}@example.org", national_id.to_ascii_lowercase())),
        phone: Some("555-0100".to_string()),
        national_id: national_id.to_string(),
        gender,
        state: state.to_string(),
        date_of_birth: Some(date(1988, 4, 12)),
    }
}

/// Register an applicant and open a case on `plan`.
pub(super) fn open_case_for<D: NoticeDispatcher + 'static>(
    service: &BenefitsService<D>,
    national_id: &str,
    plan: &Plan,
) -> BenefitCase {
    let application = service
        .register_application(&applicant(national_id, Gender::Female, "TX"))
        .expect("application registered");
    service
        .open_case(application.id, plan.id)
        .expect("case opened")
}

/// Detached bundle for pure engine tests.
pub(super) fn bundle(
    category: &str,
    income: Option<i64>,
    children: usize,
    date_of_birth: Option<NaiveDate>,
) -> CaseBundle {
    let now = decision_time();
    let case_number = CaseNumber(101);
    CaseBundle {
        application: CitizenApplication {
            id: ApplicationId(1),
            full_name: "Jordan Ellis".to_string(),
            email: None,
            phone: None,
            national_id: "NID-1".to_string(),
            gender: Gender::Other,
            state: "OH".to_string(),
            date_of_birth,
            created_at: now,
            updated_at: now,
        },
        case: BenefitCase {
            case_number,
            application_id: ApplicationId(1),
            plan_id: PlanId(1),
            created_at: now,
        },
        plan: Plan {
            id: PlanId(1),
            name: format!("{category} Benefits 2024"),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 12, 31),
            category_id: CategoryId(1),
            active: true,
            created_at: now,
            updated_at: now,
        },
        category: PlanCategory {
            id: CategoryId(1),
            name: category.to_string(),
            active: true,
            created_at: now,
            updated_at: now,
        },
        income: income.map(|amount| IncomeRecord {
            id: 1,
            case_number,
            employment_income: amount,
            property_income: 0,
            recorded_at: now,
        }),
        children: (0..children)
            .map(|index| ChildRecord {
                id: index as i64 + 1,
                case_number,
                date_of_birth: date(2018, 5, 1),
                national_id: None,
                recorded_at: now,
            })
            .collect(),
        education: None,
        latest_decision: None,
    }
}
