//! Strict entity model produced by the transformer.
//!
//! Every specialization embeds [`EntityBase`]; entity types without a dedicated
//! mapping are carried as [`Entity::Generic`] with only the base fields.

use super::types::EntityType;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

/// Fields shared by every entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityBase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_sequence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub active: bool,
}

impl Default for EntityBase {
    fn default() -> Self {
        Self {
            local_id: None,
            external_id: None,
            created_at: None,
            modified_at: None,
            edit_sequence: None,
            name: None,
            display_name: None,
            active: true,
        }
    }
}

/// Pointer to another record by id and display name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Reference {
    pub fn new(local_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            local_id: Some(local_id.into()),
            display_name: Some(display_name.into()),
        }
    }

    /// Serialize back into the wire shape, e.g. `<CustomerRef><ListID>..</ListID></CustomerRef>`
    pub fn to_qbxml(&self, tag: &str) -> String {
        let mut xml = format!("<{}>", tag);
        if let Some(local_id) = &self.local_id {
            xml.push_str(&format!("<ListID>{}</ListID>", escape(local_id.as_str())));
        }
        if let Some(display_name) = &self.display_name {
            xml.push_str(&format!(
                "<FullName>{}</FullName>",
                escape(display_name.as_str())
            ));
        }
        xml.push_str(&format!("</{}>", tag));
        xml
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardInfo {
    pub card_number: Option<String>,
    pub expiration_month: Option<f64>,
    pub expiration_year: Option<f64>,
    pub name_on_card: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(flatten)]
    pub base: EntityBase,
    pub company_name: Option<String>,
    pub salutation: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub bill_address: Option<Address>,
    pub ship_address: Option<Address>,
    pub phone: Option<String>,
    pub alt_phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub alt_contact: Option<String>,
    pub customer_type: Option<Reference>,
    pub terms: Option<Reference>,
    pub sales_rep: Option<Reference>,
    pub sales_tax_code: Option<Reference>,
    pub item_sales_tax: Option<Reference>,
    pub job_type: Option<Reference>,
    pub price_level: Option<Reference>,
    pub balance: Option<f64>,
    pub total_balance: Option<f64>,
    pub credit_limit: Option<f64>,
    pub account_number: Option<String>,
    pub credit_card: Option<CreditCardInfo>,
    pub job_status: Option<String>,
    pub job_start_date: Option<String>,
    pub job_projected_end_date: Option<String>,
    pub job_end_date: Option<String>,
    pub job_description: Option<String>,
    pub notes: Option<String>,
    pub statement_with_parent: Option<bool>,
    pub delivery_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrPurchase {
    pub description: Option<String>,
    pub price: Option<f64>,
    pub price_percent: Option<f64>,
    pub account: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Barcode {
    pub value: Option<String>,
    pub assign_even_if_used: Option<bool>,
    pub allow_override: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(flatten)]
    pub base: EntityBase,
    pub item_type: Option<String>,
    pub parent: Option<Reference>,
    pub unit_of_measure_set: Option<Reference>,
    pub sales_tax_code: Option<Reference>,
    pub preferred_vendor: Option<Reference>,
    pub sales_or_purchase: Option<SalesOrPurchase>,
    pub barcode: Option<Barcode>,
    pub tax_included: Option<bool>,
    pub quantity_on_hand: Option<f64>,
    pub total_value: Option<f64>,
    pub inventory_date: Option<String>,
    pub average_cost: Option<f64>,
    pub quantity_on_order: Option<f64>,
    pub quantity_on_sales_order: Option<f64>,
    pub reorder_point: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub item: Option<Reference>,
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub unit_of_measure: Option<String>,
    pub rate: Option<f64>,
    pub rate_percent: Option<f64>,
    pub amount: Option<f64>,
    pub customer: Option<Reference>,
    pub class: Option<Reference>,
    pub sales_tax_code: Option<Reference>,
    pub manually_closed: Option<bool>,
    pub other1: Option<String>,
    pub other2: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(flatten)]
    pub base: EntityBase,
    pub customer: Option<Reference>,
    pub class: Option<Reference>,
    pub template: Option<Reference>,
    pub txn_date: Option<String>,
    pub ref_number: Option<String>,
    pub bill_address: Option<Address>,
    pub ship_address: Option<Address>,
    pub pending: Option<bool>,
    pub finance_charge: Option<bool>,
    pub po_number: Option<String>,
    pub terms: Option<Reference>,
    pub due_date: Option<String>,
    pub sales_rep: Option<Reference>,
    pub fob: Option<String>,
    pub ship_date: Option<String>,
    pub ship_method: Option<Reference>,
    pub subtotal: Option<f64>,
    pub item_sales_tax: Option<Reference>,
    pub sales_tax_percentage: Option<f64>,
    pub sales_tax_total: Option<f64>,
    pub total_amount: Option<f64>,
    pub customer_message: Option<Reference>,
    pub customer_sales_tax_code: Option<Reference>,
    pub to_be_printed: Option<bool>,
    pub to_be_emailed: Option<bool>,
    pub other: Option<String>,
    pub memo: Option<String>,
    pub line_items: Vec<LineItem>,
}

/// Entity of a type without a dedicated mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericEntity {
    pub entity_type: EntityType,
    #[serde(flatten)]
    pub base: EntityBase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Entity {
    Customer(Customer),
    Item(Item),
    Invoice(Invoice),
    Generic(GenericEntity),
}

impl Entity {
    pub fn base(&self) -> &EntityBase {
        match self {
            Entity::Customer(customer) => &customer.base,
            Entity::Item(item) => &item.base,
            Entity::Invoice(invoice) => &invoice.base,
            Entity::Generic(generic) => &generic.base,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::Customer(_) => EntityType::Customer,
            Entity::Item(_) => EntityType::Item,
            Entity::Invoice(_) => EntityType::Invoice,
            Entity::Generic(generic) => generic.entity_type.clone(),
        }
    }

    /// Human readable label for logs
    pub fn label(&self) -> &str {
        let base = self.base();
        base.display_name
            .as_deref()
            .or(base.name.as_deref())
            .or(base.local_id.as_deref())
            .unwrap_or("<unnamed>")
    }
}
