//! The fixed subscription plan table.
//!
//! Plans are deliberately compiled in rather than stored: the set changes rarely, and a fixed table keeps the
//! payment-creation path free of another read dependency.

use sps_common::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub code: &'static str,
    pub name: &'static str,
    pub days: i64,
    pub amount: Money,
}

pub const PLANS: [Plan; 3] = [
    Plan { code: "monthly", name: "Monthly plan", days: 30, amount: Money::from_cents(2990) },
    Plan { code: "quarterly", name: "Quarterly plan", days: 90, amount: Money::from_cents(7990) },
    Plan { code: "yearly", name: "Yearly plan", days: 365, amount: Money::from_cents(29990) },
];

/// Resolves a plan code, falling back to the monthly plan for unknown codes.
pub fn plan_or_default(code: &str) -> &'static Plan {
    PLANS.iter().find(|p| p.code == code).unwrap_or(&PLANS[0])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_codes_resolve() {
        assert_eq!(plan_or_default("quarterly").days, 90);
        assert_eq!(plan_or_default("yearly").amount, Money::from_cents(29990));
    }

    #[test]
    fn unknown_code_falls_back_to_monthly() {
        let plan = plan_or_default("lifetime");
        assert_eq!(plan.code, "monthly");
        assert_eq!(plan.days, 30);
    }
}
