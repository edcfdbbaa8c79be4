//! Hosted checkout links for the premium plans.
//!
//! The payment provider hosts the whole checkout. All we do is hand out the
//! static link for a plan with the caller's reference id attached, so the
//! provider can tie the payment back to an account.

use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use thiserror::Error;

/// Query parameter the payment provider echoes back on completion
pub const REFERENCE_PARAM: &str = "client_reference_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plan {
    Monthly,
    Yearly,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Monthly => "monthly",
            Plan::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" => Ok(Plan::Monthly),
            "yearly" | "year" | "annual" => Ok(Plan::Yearly),
            other => Err(CheckoutError::UnknownPlan(other.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Unknown plan {0:?}, expected monthly or yearly")]
    UnknownPlan(String),

    #[error("No checkout link configured for the {0} plan")]
    NotConfigured(Plan),

    #[error("Checkout link for the {plan} plan is not a valid URL: {reason}")]
    InvalidLink { plan: Plan, reason: String },

    #[error("A checkout reference id is required")]
    EmptyReference,
}

/// One static checkout URL per plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutLinks {
    pub monthly: Option<String>,
    pub yearly: Option<String>,
}

impl CheckoutLinks {
    pub fn link(&self, plan: Plan) -> Option<&str> {
        match plan {
            Plan::Monthly => self.monthly.as_deref(),
            Plan::Yearly => self.yearly.as_deref(),
        }
    }

    /// The plan's link with `client_reference_id` appended.
    ///
    /// Existing query parameters are kept; the reference is URL-encoded.
    pub fn checkout_url(&self, plan: Plan, reference_id: &str) -> Result<String, CheckoutError> {
        let reference_id = reference_id.trim();
        if reference_id.is_empty() {
            return Err(CheckoutError::EmptyReference);
        }

        let link = self.link(plan).ok_or(CheckoutError::NotConfigured(plan))?;
        let mut url = Url::parse(link).map_err(|e| CheckoutError::InvalidLink {
            plan,
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair(REFERENCE_PARAM, reference_id);
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> CheckoutLinks {
        CheckoutLinks {
            monthly: Some("https://pay.example.com/b/monthly".to_string()),
            yearly: Some("https://pay.example.com/b/yearly?prefilled_promo=SPRING".to_string()),
        }
    }

    #[test]
    fn test_reference_is_appended() {
        let url = links().checkout_url(Plan::Monthly, "user-42").unwrap();
        assert_eq!(url, "https://pay.example.com/b/monthly?client_reference_id=user-42");
    }

    #[test]
    fn test_existing_query_is_preserved() {
        let url = links().checkout_url(Plan::Yearly, "a b").unwrap();
        assert_eq!(
            url,
            "https://pay.example.com/b/yearly?prefilled_promo=SPRING&client_reference_id=a+b"
        );
    }

    #[test]
    fn test_empty_reference_is_rejected() {
        assert_eq!(
            links().checkout_url(Plan::Monthly, "  "),
            Err(CheckoutError::EmptyReference)
        );
    }

    #[test]
    fn test_missing_or_broken_link() {
        let links = CheckoutLinks {
            monthly: Some("not a url".to_string()),
            yearly: None,
        };
        assert_eq!(
            links.checkout_url(Plan::Yearly, "u1"),
            Err(CheckoutError::NotConfigured(Plan::Yearly))
        );
        assert!(matches!(
            links.checkout_url(Plan::Monthly, "u1"),
            Err(CheckoutError::InvalidLink { plan: Plan::Monthly, .. })
        ));
    }

    #[test]
    fn test_plan_parsing() {
        assert_eq!("Monthly".parse::<Plan>().unwrap(), Plan::Monthly);
        assert_eq!("annual".parse::<Plan>().unwrap(), Plan::Yearly);
        assert!("weekly".parse::<Plan>().is_err());
    }
}
