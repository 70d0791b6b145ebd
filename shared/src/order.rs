//! Order domain types
//!
//! Snapshot types shared between the order server and its clients.
//! A [`PricedLineItem`] is priced exactly once, at order-assembly time;
//! everything it needs to reproduce its own total is denormalized into it.

use serde::{Deserialize, Serialize};

// ============================================================================
// Status Enums
// ============================================================================

/// Order lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Rejected => "Rejected",
        }
    }
}

/// Payment settlement status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

/// Payment method selected at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    Card,
    PayPal,
    Wallet,
}

impl PaymentMethod {
    /// Card and PayPal settle asynchronously via a hosted redirect; only
    /// those methods can leave an order parked in Pending awaiting payment.
    pub fn is_redirect(&self) -> bool {
        matches!(self, PaymentMethod::Card | PaymentMethod::PayPal)
    }
}

// ============================================================================
// Addon Types
// ============================================================================

/// Addon option category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AddonKind {
    Sauce,
    Drink,
    Side,
}

impl AddonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddonKind::Sauce => "sauce",
            AddonKind::Drink => "drink",
            AddonKind::Side => "side",
        }
    }
}

// ============================================================================
// Meal Selection (request-side)
// ============================================================================

/// A requested meal: what the customer asked for, before pricing.
///
/// Exists only inside a cart entry or an incoming order request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealSelection {
    pub meal_id: String,
    pub quantity: i32,
    #[serde(default)]
    pub is_combo: bool,
    /// Chosen option ids, in selection order (combo only)
    #[serde(default)]
    pub sauces: Vec<String>,
    #[serde(default)]
    pub drinks: Vec<String>,
    #[serde(default)]
    pub sides: Vec<String>,
}

impl MealSelection {
    /// Two selections merge into one cart entry when they are the same
    /// meal in the same combo configuration with identical addon choices.
    pub fn merges_with(&self, other: &MealSelection) -> bool {
        self.meal_id == other.meal_id
            && self.is_combo == other.is_combo
            && (!self.is_combo
                || (self.sauces == other.sauces
                    && self.drinks == other.drinks
                    && self.sides == other.sides))
    }
}

// ============================================================================
// Priced Snapshot (order-side)
// ============================================================================

/// A resolved addon with the price actually charged for it.
///
/// `price` is 0 when the addon fell inside the free allowance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricedAddon {
    pub option_id: String,
    pub name: String,
    pub price: f64,
}

/// Immutable result of pricing one meal selection.
///
/// Created once at order-assembly time and never recalculated; the stored
/// `line_total` must always equal `unit_price * quantity` plus the sum of
/// charged addon prices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricedLineItem {
    pub meal_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub unit_price: f64,
    pub quantity: i32,
    pub is_combo: bool,
    pub sauces: Vec<PricedAddon>,
    pub drinks: Vec<PricedAddon>,
    pub sides: Vec<PricedAddon>,
    pub line_total: f64,
}

impl PricedLineItem {
    /// All addons across categories, in category-then-selection order.
    pub fn addons(&self) -> impl Iterator<Item = &PricedAddon> {
        self.sauces
            .iter()
            .chain(self.drinks.iter())
            .chain(self.sides.iter())
    }

    /// Addons that carried a non-zero charge (used for provider line items).
    pub fn charged_addons(&self) -> impl Iterator<Item = &PricedAddon> {
        self.addons().filter(|a| a.price > 0.0)
    }
}

// ============================================================================
// Delivery Info
// ============================================================================

/// Fulfillment contact details captured at checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub address: String,
    pub city: String,
    pub state: String,
    pub phone: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
    }

    #[test]
    fn redirect_methods() {
        assert!(PaymentMethod::Card.is_redirect());
        assert!(PaymentMethod::PayPal.is_redirect());
        assert!(!PaymentMethod::Wallet.is_redirect());
    }

    #[test]
    fn selection_merge_ignores_addons_for_non_combo() {
        let a = MealSelection {
            meal_id: "meal-1".into(),
            quantity: 1,
            is_combo: false,
            sauces: vec!["s1".into()],
            drinks: vec![],
            sides: vec![],
        };
        let b = MealSelection {
            meal_id: "meal-1".into(),
            quantity: 3,
            is_combo: false,
            sauces: vec![],
            drinks: vec![],
            sides: vec![],
        };
        assert!(a.merges_with(&b));
    }

    #[test]
    fn selection_merge_compares_addons_for_combo() {
        let a = MealSelection {
            meal_id: "meal-1".into(),
            quantity: 1,
            is_combo: true,
            sauces: vec!["s1".into()],
            drinks: vec![],
            sides: vec![],
        };
        let mut b = a.clone();
        assert!(a.merges_with(&b));
        b.sauces = vec!["s2".into()];
        assert!(!a.merges_with(&b));
    }

    #[test]
    fn charged_addons_skips_free_allowance() {
        let item = PricedLineItem {
            meal_id: "meal-1".into(),
            title: "Crispy Bucket".into(),
            description: None,
            unit_price: 10.0,
            quantity: 2,
            is_combo: true,
            sauces: vec![
                PricedAddon {
                    option_id: "s1".into(),
                    name: "BBQ".into(),
                    price: 0.0,
                },
                PricedAddon {
                    option_id: "s2".into(),
                    name: "Garlic".into(),
                    price: 1.0,
                },
            ],
            drinks: vec![],
            sides: vec![],
            line_total: 21.0,
        };
        let charged: Vec<_> = item.charged_addons().collect();
        assert_eq!(charged.len(), 1);
        assert_eq!(charged[0].option_id, "s2");
    }
}
