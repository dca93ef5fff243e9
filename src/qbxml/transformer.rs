//! Maps parsed QBXML response messages onto the strict entity model.

use super::document::{DocumentError, RawValue, XmlElement};
use super::entity::{
    Address, Barcode, CreditCardInfo, Customer, Entity, EntityBase, GenericEntity, Invoice, Item,
    LineItem, Reference, SalesOrPurchase,
};
use super::types::{EntityType, Operation};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

static LEADING_FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("valid float regex")
});

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Invalid XML: {0}")]
    Parse(#[from] DocumentError),
    #[error("Invalid QBXML response structure")]
    InvalidStructure,
    #[error("No response elements found")]
    NoResponseElements,
    #[error("Response reported status {code}: {message}")]
    ResponseStatus { code: String, message: String },
}

impl TransformError {
    /// Issue code used when folding this failure into a result envelope
    pub fn code(&self) -> String {
        match self {
            TransformError::Parse(_) => "INVALID_XML".to_string(),
            TransformError::InvalidStructure => "INVALID_STRUCTURE".to_string(),
            TransformError::NoResponseElements => "NO_RESPONSE_ELEMENTS".to_string(),
            TransformError::ResponseStatus { code, .. } => code.clone(),
        }
    }
}

/// Envelope metadata of a response message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInfo {
    pub request_id: Option<String>,
    pub entity_type: EntityType,
    pub operation: Operation,
    pub status_code: String,
    pub status_message: String,
}

impl ResponseInfo {
    pub fn is_success(&self) -> bool {
        self.status_code == "0"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseTransform {
    pub info: ResponseInfo,
    pub entities: Vec<Entity>,
}

/// Stateless QBXML to entity mapper
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer;

impl Transformer {
    pub fn new() -> Self {
        Self
    }

    /// Parse and transform a whole response document.
    ///
    /// The entity type is taken from the first response element name, then from
    /// `expected`, then defaults to Customer. A non-zero status on any response
    /// element fails with [`TransformError::ResponseStatus`].
    pub fn transform_response(
        &self,
        xml: &str,
        expected: Option<&EntityType>,
    ) -> Result<ResponseTransform, TransformError> {
        let root = XmlElement::parse(xml)?;
        self.transform_document(&root, expected)
    }

    pub fn transform_document(
        &self,
        root: &XmlElement,
        expected: Option<&EntityType>,
    ) -> Result<ResponseTransform, TransformError> {
        let msgs = Self::response_container(root).ok_or(TransformError::InvalidStructure)?;
        let info = Self::response_info(msgs, expected)?;

        if let Some(failed) = msgs
            .children_with_suffix("Rs")
            .find(|rs| status_code(rs) != "0")
        {
            return Err(TransformError::ResponseStatus {
                code: status_code(failed).to_string(),
                message: failed
                    .attribute("statusMessage")
                    .filter(|message| !message.is_empty())
                    .unwrap_or("Unknown error")
                    .to_string(),
            });
        }

        let ret_name = info.entity_type.ret_element();
        let entities = msgs
            .children_with_suffix("Rs")
            .flat_map(|rs| rs.children_named(&ret_name))
            .map(|raw| self.transform_entity(raw, &info.entity_type))
            .collect();

        Ok(ResponseTransform { info, entities })
    }

    /// Locate the single `QBXML/QBXMLMsgsRs` container
    pub fn response_container(root: &XmlElement) -> Option<&XmlElement> {
        if root.name != "QBXML" || root.children_named("QBXMLMsgsRs").count() != 1 {
            return None;
        }
        root.child("QBXMLMsgsRs")
    }

    fn response_info(
        msgs: &XmlElement,
        expected: Option<&EntityType>,
    ) -> Result<ResponseInfo, TransformError> {
        let first = msgs
            .children_with_suffix("Rs")
            .next()
            .ok_or(TransformError::NoResponseElements)?;

        let (entity_type, operation) = match EntityType::parse_message_name(&first.name) {
            Some(detected) => detected,
            None => (
                expected.cloned().unwrap_or(EntityType::Customer),
                Operation::Query,
            ),
        };

        Ok(ResponseInfo {
            request_id: first
                .attribute("requestID")
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            entity_type,
            operation,
            status_code: status_code(first).to_string(),
            status_message: first.attribute("statusMessage").unwrap_or("").to_string(),
        })
    }

    /// Type-keyed dispatch; unmapped types keep only the base fields
    pub fn transform_entity(&self, raw: &XmlElement, entity_type: &EntityType) -> Entity {
        match entity_type {
            EntityType::Customer => Entity::Customer(self.customer(raw)),
            EntityType::Item => Entity::Item(self.item(raw)),
            EntityType::Invoice => Entity::Invoice(self.invoice(raw)),
            other => Entity::Generic(GenericEntity {
                entity_type: other.clone(),
                base: self.base(raw),
            }),
        }
    }

    fn base(&self, raw: &XmlElement) -> EntityBase {
        EntityBase {
            local_id: extract_text(raw.value("ListID")),
            external_id: extract_text(raw.value("ExternalGUID")),
            created_at: extract_text(raw.value("TimeCreated")),
            modified_at: extract_text(raw.value("TimeModified")),
            edit_sequence: extract_text(raw.value("EditSequence")),
            name: extract_text(raw.value("Name")),
            display_name: extract_text(raw.value("FullName")),
            active: extract_bool(raw.value("IsActive"), Some(true)).unwrap_or(true),
        }
    }

    fn customer(&self, raw: &XmlElement) -> Customer {
        Customer {
            base: self.base(raw),
            company_name: extract_text(raw.value("CompanyName")),
            salutation: extract_text(raw.value("Salutation")),
            first_name: extract_text(raw.value("FirstName")),
            middle_name: extract_text(raw.value("MiddleName")),
            last_name: extract_text(raw.value("LastName")),
            bill_address: raw.child("BillAddress").map(address),
            ship_address: raw.child("ShipAddress").map(address),
            phone: extract_text(raw.value("Phone")),
            alt_phone: extract_text(raw.value("AltPhone")),
            fax: extract_text(raw.value("Fax")),
            email: extract_text(raw.value("Email")),
            contact: extract_text(raw.value("Contact")),
            alt_contact: extract_text(raw.value("AltContact")),
            customer_type: raw.child("CustomerTypeRef").map(reference),
            terms: raw.child("TermsRef").map(reference),
            sales_rep: raw.child("SalesRepRef").map(reference),
            sales_tax_code: raw.child("SalesTaxCodeRef").map(reference),
            item_sales_tax: raw.child("ItemSalesTaxRef").map(reference),
            job_type: raw.child("JobTypeRef").map(reference),
            price_level: raw.child("PriceLevelRef").map(reference),
            balance: extract_number(raw.value("Balance")),
            total_balance: extract_number(raw.value("TotalBalance")),
            credit_limit: extract_number(raw.value("CreditLimit")),
            account_number: extract_text(raw.value("AccountNumber")),
            credit_card: raw.child("CreditCardInfo").map(credit_card),
            job_status: extract_text(raw.value("JobStatus")),
            job_start_date: extract_text(raw.value("JobStartDate")),
            job_projected_end_date: extract_text(raw.value("JobProjectedEndDate")),
            job_end_date: extract_text(raw.value("JobEndDate")),
            job_description: extract_text(raw.value("JobDesc")),
            notes: extract_text(raw.value("Notes")),
            statement_with_parent: extract_bool(raw.value("IsStatementWithParent"), None),
            delivery_method: extract_text(raw.value("DeliveryMethod")),
        }
    }

    fn item(&self, raw: &XmlElement) -> Item {
        Item {
            base: self.base(raw),
            item_type: extract_text(raw.value("Type")),
            parent: raw.child("ParentRef").map(reference),
            unit_of_measure_set: raw.child("UnitOfMeasureSetRef").map(reference),
            sales_tax_code: raw.child("SalesTaxCodeRef").map(reference),
            preferred_vendor: raw.child("PreferredVendorRef").map(reference),
            sales_or_purchase: raw.child("SalesOrPurchase").map(|sop| SalesOrPurchase {
                description: extract_text(sop.value("Desc")),
                price: extract_number(sop.value("Price")),
                price_percent: extract_number(sop.value("PricePercent")),
                account: sop.child("AccountRef").map(reference),
            }),
            barcode: raw.child("Barcode").map(|barcode| Barcode {
                value: extract_text(barcode.value("BarCodeValue")),
                assign_even_if_used: extract_bool(barcode.value("AssignEvenIfUsed"), None),
                allow_override: extract_bool(barcode.value("AllowOverride"), None),
            }),
            tax_included: extract_bool(raw.value("IsTaxIncluded"), None),
            quantity_on_hand: extract_number(raw.value("QtyOnHand")),
            total_value: extract_number(raw.value("TotalValue")),
            inventory_date: extract_text(raw.value("InventoryDate")),
            average_cost: extract_number(raw.value("AverageCost")),
            quantity_on_order: extract_number(raw.value("QuantityOnOrder")),
            quantity_on_sales_order: extract_number(raw.value("QuantityOnSalesOrder")),
            reorder_point: extract_number(raw.value("ReorderPoint")),
            max: extract_number(raw.value("Max")),
        }
    }

    fn invoice(&self, raw: &XmlElement) -> Invoice {
        Invoice {
            base: self.base(raw),
            customer: raw.child("CustomerRef").map(reference),
            class: raw.child("ClassRef").map(reference),
            template: raw.child("TemplateRef").map(reference),
            txn_date: extract_text(raw.value("TxnDate")),
            ref_number: extract_text(raw.value("RefNumber")),
            bill_address: raw.child("BillAddress").map(address),
            ship_address: raw.child("ShipAddress").map(address),
            pending: extract_bool(raw.value("IsPending"), None),
            finance_charge: extract_bool(raw.value("IsFinanceCharge"), None),
            po_number: extract_text(raw.value("PONumber")),
            terms: raw.child("TermsRef").map(reference),
            due_date: extract_text(raw.value("DueDate")),
            sales_rep: raw.child("SalesRepRef").map(reference),
            fob: extract_text(raw.value("FOB")),
            ship_date: extract_text(raw.value("ShipDate")),
            ship_method: raw.child("ShipMethodRef").map(reference),
            subtotal: extract_number(raw.value("Subtotal")),
            item_sales_tax: raw.child("ItemSalesTaxRef").map(reference),
            sales_tax_percentage: extract_number(raw.value("SalesTaxPercentage")),
            sales_tax_total: extract_number(raw.value("SalesTaxTotal")),
            total_amount: extract_number(raw.value("TotalAmount")),
            customer_message: raw.child("CustomerMsgRef").map(reference),
            customer_sales_tax_code: raw.child("CustomerSalesTaxCodeRef").map(reference),
            to_be_printed: extract_bool(raw.value("IsToBePrinted"), None),
            to_be_emailed: extract_bool(raw.value("IsToBeEmailed"), None),
            other: extract_text(raw.value("Other")),
            memo: extract_text(raw.value("Memo")),
            // A single line and a repeated line both arrive as a sequence here
            line_items: raw.children_named("InvoiceLineRet").map(line_item).collect(),
        }
    }
}

fn status_code(rs: &XmlElement) -> &str {
    rs.attribute("statusCode")
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .unwrap_or("0")
}

pub fn reference(raw: &XmlElement) -> Reference {
    Reference {
        local_id: extract_text(raw.value("ListID")),
        display_name: extract_text(raw.value("FullName")),
    }
}

fn address(raw: &XmlElement) -> Address {
    Address {
        lines: ["Addr1", "Addr2", "Addr3", "Addr4", "Addr5"]
            .iter()
            .filter_map(|line| extract_text(raw.value(line)))
            .collect(),
        city: extract_text(raw.value("City")),
        state: extract_text(raw.value("State")),
        postal_code: extract_text(raw.value("PostalCode")),
        country: extract_text(raw.value("Country")),
        note: extract_text(raw.value("Note")),
    }
}

fn credit_card(raw: &XmlElement) -> CreditCardInfo {
    CreditCardInfo {
        card_number: extract_text(raw.value("CreditCardNumber")),
        expiration_month: extract_number(raw.value("ExpirationMonth")),
        expiration_year: extract_number(raw.value("ExpirationYear")),
        name_on_card: extract_text(raw.value("NameOnCard")),
        address: extract_text(raw.value("CreditCardAddress")),
        postal_code: extract_text(raw.value("CreditCardPostalCode")),
    }
}

fn line_item(raw: &XmlElement) -> LineItem {
    LineItem {
        item: raw.child("ItemRef").map(reference),
        description: extract_text(raw.value("Desc")),
        quantity: extract_number(raw.value("Quantity")),
        unit_of_measure: extract_text(raw.value("UnitOfMeasure")),
        rate: extract_number(raw.value("Rate")),
        rate_percent: extract_number(raw.value("RatePercent")),
        amount: extract_number(raw.value("Amount")),
        customer: raw.child("CustomerRef").map(reference),
        class: raw.child("ClassRef").map(reference),
        sales_tax_code: raw.child("SalesTaxCodeRef").map(reference),
        manually_closed: extract_bool(raw.value("IsManuallyClosed"), None),
        other1: extract_text(raw.value("Other1")),
        other2: extract_text(raw.value("Other2")),
    }
}

/// Trimmed text; empty text is treated as absent
pub fn extract_text(value: RawValue<'_>) -> Option<String> {
    value
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Parse the leading decimal number of the text, ignoring trailing garbage
pub fn extract_number(value: RawValue<'_>) -> Option<f64> {
    let text = value.text()?.trim();
    LEADING_FLOAT
        .find(text)
        .and_then(|matched| matched.as_str().parse::<f64>().ok())
}

/// `true`/`1` and `false`/`0` (any case); everything else yields `default`
pub fn extract_bool(value: RawValue<'_>, default: Option<bool>) -> Option<bool> {
    let Some(text) = value.text() else {
        return default;
    };
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => default,
    }
}
