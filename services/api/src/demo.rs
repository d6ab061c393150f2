use crate::admin::{case_status_table, pending_trigger_table};
use crate::infra::{LoggingNoticeDispatcher, Service};
use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use clap::Args;
use his_core::error::AppError;
use his_core::store::Database;
use his_core::workflows::benefits::{
    BenefitsService, CaseNumber, CaseStatusFilter, EligibilityPolicy, EligibilityRun, Gender,
    NewApplication, NewChild, NewIncome, NewPlan, Plan,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Decision date used for age and validity (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Leave notices pending instead of dispatching them at the end.
    #[arg(long)]
    pub(crate) skip_dispatch: bool,
}

struct Scenario {
    program: &'static str,
    applicant: NewApplication,
    income: Option<NewIncome>,
    children: Vec<NaiveDate>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());
    let decided_at = today
        .and_hms_opt(9, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_else(Utc::now);

    let service: Service = BenefitsService::new(
        Database::in_memory()?,
        Arc::new(LoggingNoticeDispatcher),
        EligibilityPolicy::default(),
    );

    println!("Benefit eligibility demo (decisions dated {today})");
    for scenario in scenarios(today) {
        let plan = seed_plan(&service, scenario.program, today)?;
        let applicant_name = scenario.applicant.full_name.clone();
        let registered = service.register_application(&scenario.applicant)?;
        let case = service.open_case(registered.id, plan.id)?;

        if let Some(income) = &scenario.income {
            service.submit_income(case.case_number, income)?;
        }
        for date_of_birth in &scenario.children {
            service.submit_child(
                case.case_number,
                &NewChild {
                    date_of_birth: *date_of_birth,
                    national_id: None,
                },
            )?;
        }

        let run = service.run_eligibility_at(case.case_number, decided_at)?;
        render_run(&applicant_name, &plan, case.case_number, &run);
    }

    println!("\nCase status");
    println!(
        "{}",
        case_status_table(&service.case_status_report(&CaseStatusFilter::default())?)
    );

    println!("\nOutbox");
    println!(
        "{}",
        pending_trigger_table(&service.pending_trigger_report(None)?)
    );

    if args.skip_dispatch {
        return Ok(());
    }
    let summary = service.dispatch_pending(None)?;
    println!(
        "\nDispatched {} notices ({} failed)",
        summary.sent.len(),
        summary.failed.len()
    );
    Ok(())
}

fn seed_plan(service: &Service, program: &str, today: NaiveDate) -> Result<Plan, AppError> {
    let category = service.create_category(program)?;
    let start_date = today.with_ordinal(1).unwrap_or(today);
    let end_date = start_date
        .checked_add_months(chrono::Months::new(12))
        .and_then(|date| date.pred_opt())
        .unwrap_or(today);
    let plan = service.create_plan(&NewPlan {
        name: format!("{program} {}", start_date.format("%Y")),
        start_date,
        end_date,
        category_id: category.id,
    })?;
    Ok(plan)
}

fn scenarios(today: NaiveDate) -> Vec<Scenario> {
    let years_ago = |years: u32| {
        today
            .checked_sub_months(chrono::Months::new(years * 12))
            .unwrap_or(today)
    };
    let applicant = |name: &str, national_id: &str, gender: Gender, born: Option<NaiveDate>| {
        NewApplication {
            full_name: name.to_string(),
            email: None,
            phone: None,
            national_id: national_id.to_string(),
            gender,
            state: "KS".to_string(),
            date_of_birth: born,
        }
    };

    vec![
        Scenario {
            program: "SNAP",
            applicant: applicant("Jordan Avery", "DEMO-001", Gender::Female, Some(years_ago(34))),
            income: Some(NewIncome {
                employment_income: 150_000,
                property_income: 0,
            }),
            children: Vec::new(),
        },
        Scenario {
            program: "CCAP",
            applicant: applicant("Riley Brooks", "DEMO-002", Gender::Male, Some(years_ago(29))),
            income: Some(NewIncome {
                employment_income: 350_000,
                property_income: 0,
            }),
            children: Vec::new(),
        },
        Scenario {
            program: "Medicaid",
            applicant: applicant("Morgan Ellis", "DEMO-003", Gender::Other, Some(years_ago(41))),
            income: Some(NewIncome {
                employment_income: 180_000,
                property_income: 20_000,
            }),
            children: vec![years_ago(6)],
        },
        Scenario {
            program: "Medicare",
            applicant: applicant("Taylor Grant", "DEMO-004", Gender::Female, Some(years_ago(70))),
            income: None,
            children: Vec::new(),
        },
        Scenario {
            program: "QHP",
            applicant: applicant("Casey Hughes", "DEMO-005", Gender::Male, None),
            income: Some(NewIncome {
                employment_income: 90_000,
                property_income: 0,
            }),
            children: Vec::new(),
        },
    ]
}

fn render_run(applicant: &str, plan: &Plan, case_number: CaseNumber, run: &EligibilityRun) {
    let decision = &run.decision;
    println!(
        "\n- {applicant} -> {} (case {case_number}): {}",
        plan.name,
        decision.status.label()
    );
    if decision.benefit_amount > 0 {
        println!("  Monthly benefit: {}", decision.benefit_amount);
    }
    if let (Some(start), Some(end)) = (decision.validity_start, decision.validity_end) {
        println!("  Valid {start} -> {end}");
    }
    if let Some(reason) = &decision.denial_reason {
        println!("  Denial reason: {reason}");
    }
    println!("  Notice: {}", run.trigger.notice);
}
