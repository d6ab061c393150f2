use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(CategoryId);
record_id!(PlanId);
record_id!(AccountId);
record_id!(ApplicationId);
record_id!(
    /// Externally visible case handle, allocated by the store and never reassigned.
    CaseNumber
);
record_id!(DecisionId);
record_id!(TriggerId);

/// Benefit programs with fixed eligibility rules, keyed by plan category name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Program {
    Snap,
    Ccap,
    Medicaid,
    Medicare,
    Qhp,
}

impl Program {
    pub fn from_category(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "SNAP" => Some(Self::Snap),
            "CCAP" => Some(Self::Ccap),
            "MEDICAID" => Some(Self::Medicaid),
            "MEDICARE" => Some(Self::Medicare),
            "QHP" => Some(Self::Qhp),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Program::Snap => "SNAP",
            Program::Ccap => "CCAP",
            Program::Medicaid => "Medicaid",
            Program::Medicare => "Medicare",
            Program::Qhp => "QHP",
        }
    }

    /// Programs whose rule depends on household income.
    pub const fn is_income_tested(self) -> bool {
        matches!(self, Program::Snap | Program::Ccap | Program::Medicaid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
            Gender::Other => "OTHER",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "M" | "MALE" => Ok(Gender::Male),
            "F" | "FEMALE" => Ok(Gender::Female),
            "O" | "OTHER" | "X" => Ok(Gender::Other),
            other => Err(format!("unknown gender: {other}")),
        }
    }
}

/// Stored role of a caseworker account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRole {
    Admin,
    Caseworker,
}

impl AccountRole {
    pub const fn label(self) -> &'static str {
        match self {
            AccountRole::Admin => "ADMIN",
            AccountRole::Caseworker => "CASEWORKER",
        }
    }
}

impl FromStr for AccountRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ADMIN" => Ok(AccountRole::Admin),
            "CASEWORKER" => Ok(AccountRole::Caseworker),
            other => Err(format!("unknown account role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Approved,
    Denied,
    PurchaseRequired,
    Pending,
}

impl DecisionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DecisionStatus::Approved => "APPROVED",
            DecisionStatus::Denied => "DENIED",
            DecisionStatus::PurchaseRequired => "PURCHASE_REQUIRED",
            DecisionStatus::Pending => "PENDING",
        }
    }
}

impl FromStr for DecisionStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "APPROVED" => Ok(DecisionStatus::Approved),
            "DENIED" => Ok(DecisionStatus::Denied),
            "PURCHASE_REQUIRED" => Ok(DecisionStatus::PurchaseRequired),
            "PENDING" => Ok(DecisionStatus::Pending),
            other => Err(format!("unknown decision status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerStatus {
    Pending,
    Sent,
}

impl TriggerStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TriggerStatus::Pending => "PENDING",
            TriggerStatus::Sent => "SENT",
        }
    }
}

impl FromStr for TriggerStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(TriggerStatus::Pending),
            "SENT" => Ok(TriggerStatus::Sent),
            other => Err(format!("unknown trigger status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCategory {
    pub id: CategoryId,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category_id: CategoryId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlan {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category_id: CategoryId,
}

/// Caseworker or administrator account. The credential is write-only: it is stored for
/// the external login layer and never read back into this model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseWorkerAccount {
    pub id: AccountId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub gender: Gender,
    pub national_id: String,
    pub date_of_birth: Option<NaiveDate>,
    pub role: AccountRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCaseWorkerAccount {
    pub full_name: String,
    pub email: String,
    pub credential: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub gender: Gender,
    pub national_id: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    pub role: AccountRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenApplication {
    pub id: ApplicationId,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub national_id: String,
    pub gender: Gender,
    pub state: String,
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CitizenApplication {
    /// Whole years of age on `as_of`, or `None` when no birth date was captured.
    pub fn age_on(&self, as_of: NaiveDate) -> Option<u32> {
        self.date_of_birth.map(|born| whole_years_between(born, as_of))
    }
}

pub(crate) fn whole_years_between(born: NaiveDate, as_of: NaiveDate) -> u32 {
    let mut years = as_of.year() - born.year();
    if (as_of.month(), as_of.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

/// Intake fields captured when an application is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub national_id: String,
    pub gender: Gender,
    pub state: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

/// Mutable contact fields; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitCase {
    pub case_number: CaseNumber,
    pub application_id: ApplicationId,
    pub plan_id: PlanId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIncome {
    pub employment_income: i64,
    #[serde(default)]
    pub property_income: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub id: i64,
    pub case_number: CaseNumber,
    pub employment_income: i64,
    pub property_income: i64,
    pub recorded_at: DateTime<Utc>,
}

impl IncomeRecord {
    pub fn total(&self) -> i64 {
        self.employment_income.saturating_add(self.property_income)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChild {
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub national_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRecord {
    pub id: i64,
    pub case_number: CaseNumber,
    pub date_of_birth: NaiveDate,
    pub national_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEducation {
    pub qualification: String,
    pub graduation_year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationRecord {
    pub id: i64,
    pub case_number: CaseNumber,
    pub qualification: String,
    pub graduation_year: i32,
    pub recorded_at: DateTime<Utc>,
}

/// Persisted, immutable eligibility determination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityDecision {
    pub id: DecisionId,
    pub case_number: CaseNumber,
    pub plan_name: String,
    pub status: DecisionStatus,
    pub validity_start: Option<NaiveDate>,
    pub validity_end: Option<NaiveDate>,
    pub benefit_amount: i64,
    pub denial_reason: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Outbound-notice work item produced alongside each decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrespondenceTrigger {
    pub id: TriggerId,
    pub case_number: CaseNumber,
    pub decision_id: DecisionId,
    pub status: TriggerStatus,
    pub notice: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decision and trigger written together by one eligibility run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRun {
    pub decision: EligibilityDecision,
    pub trigger: CorrespondenceTrigger,
}

/// Aggregated facts about one case, as handed to the rule engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseBundle {
    pub application: CitizenApplication,
    pub case: BenefitCase,
    pub plan: Plan,
    pub category: PlanCategory,
    pub income: Option<IncomeRecord>,
    pub children: Vec<ChildRecord>,
    pub education: Option<EducationRecord>,
    pub latest_decision: Option<EligibilityDecision>,
}

impl CaseBundle {
    pub fn program(&self) -> Option<Program> {
        Program::from_category(&self.category.name)
    }

    /// Employment plus property income of the authoritative record; zero when absent.
    pub fn total_income(&self) -> i64 {
        self.income.as_ref().map(IncomeRecord::total).unwrap_or(0)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn current_status(&self) -> DecisionStatus {
        self.latest_decision
            .as_ref()
            .map(|decision| decision.status)
            .unwrap_or(DecisionStatus::Pending)
    }
}
