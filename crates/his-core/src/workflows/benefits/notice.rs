//! Plain-text notice composition for eligibility decisions.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{CitizenApplication, DecisionStatus, Program};
use super::eligibility::Determination;

/// Single-paragraph notice body queued on a correspondence trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoticeText(String);

impl NoticeText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NoticeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First `max_chars` characters, never splitting a code point.
pub(crate) fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn program_label(determination: &Determination) -> &'static str {
    determination
        .program
        .map(Program::label)
        .unwrap_or("the requested")
}

fn approval_sentence(program: Option<Program>) -> &'static str {
    match program {
        Some(Program::Snap) => "your application for SNAP has been approved",
        Some(Program::Ccap) => {
            "your CCAP application is approved and child care assistance will be provided"
        }
        Some(Program::Medicaid) => "you are approved for Medicaid health coverage",
        Some(Program::Medicare) => "you qualify for Medicare benefits due to age eligibility",
        Some(Program::Qhp) | None => "your application has been approved",
    }
}

fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Compose the notice for `determination`. Pure: the same inputs give the same text.
pub fn compose(determination: &Determination, applicant: &CitizenApplication) -> NoticeText {
    let name = applicant.full_name.trim();
    let plan = &determination.plan_name;
    let case_number = determination.case_number;

    let body = match determination.status {
        DecisionStatus::Approved => {
            let window = match (determination.validity_start, determination.validity_end) {
                (Some(start), Some(end)) => {
                    format!(" from {} through {}", long_date(start), long_date(end))
                }
                _ => String::new(),
            };
            format!(
                "Dear {name}, {} under the plan {plan} (case {case_number}). \
                 You will receive a benefit of {} per month{window}.",
                approval_sentence(determination.program),
                determination.benefit_amount
            )
        }
        DecisionStatus::PurchaseRequired => format!(
            "Dear {name}, you are not eligible for free coverage under the plan {plan} \
             (case {case_number}). You may purchase a Qualified Health Plan."
        ),
        DecisionStatus::Denied => {
            let reason = determination
                .denial_reason
                .as_deref()
                .unwrap_or("the eligibility criteria were not met");
            format!(
                "Dear {name}, after review you are not eligible for {} benefits under the plan \
                 {plan} (case {case_number}). Reason: {reason}.",
                program_label(determination)
            )
        }
        DecisionStatus::Pending => format!(
            "Dear {name}, your application for {} benefits under the plan {plan} \
             (case {case_number}) is still under review.",
            program_label(determination)
        ),
    };

    NoticeText(body)
}
