use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OperatingHours;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CentreStatus {
    PendingVerification,
    Verified,
    Suspended,
    Rejected,
}

impl CentreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CentreStatus::PendingVerification => "PENDING_VERIFICATION",
            CentreStatus::Verified => "VERIFIED",
            CentreStatus::Suspended => "SUSPENDED",
            CentreStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING_VERIFICATION" => Some(CentreStatus::PendingVerification),
            "VERIFIED" => Some(CentreStatus::Verified),
            "SUSPENDED" => Some(CentreStatus::Suspended),
            "REJECTED" => Some(CentreStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Locality {
    pub state: String,
    pub lga: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Centre {
    pub id: i64,
    pub name: String,
    pub locality: Locality,
    #[serde(default)]
    pub services: Vec<Service>,
    pub average_rating: f64,
    pub status: CentreStatus,
    #[serde(default)]
    pub operating_hours: OperatingHours,
}

impl Centre {
    pub fn is_verified(&self) -> bool {
        self.status == CentreStatus::Verified
    }

    pub fn service(&self, service_id: i64) -> Option<&Service> {
        self.services.iter().find(|s| s.id == service_id)
    }

    pub fn available_services(&self) -> impl Iterator<Item = &Service> {
        self.services.iter().filter(|s| s.is_available)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: i64,
    pub service_name: String,
    pub service_type: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Option<Decimal>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub time_duration: Option<String>,
    #[serde(default)]
    pub result_delivery_time: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Service {
    /// Price a patient pays today: the discount when one is set.
    pub fn effective_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }

    pub fn check_pricing(&self) -> Result<(), String> {
        if self.price < Decimal::ZERO {
            return Err(format!("service {} has a negative price", self.id));
        }
        if let Some(discount) = self.discount_price {
            if discount < Decimal::ZERO {
                return Err(format!("service {} has a negative discount price", self.id));
            }
            if discount > self.price {
                return Err(format!(
                    "service {} discount price {discount} exceeds price {}",
                    self.id, self.price
                ));
            }
        }
        Ok(())
    }
}
