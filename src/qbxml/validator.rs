//! Structural validation of QBXML documents and semantic validation of
//! transformed entities.
//!
//! Findings never abort a pass: every check appends to a [`ValidationResult`].

use super::document::XmlElement;
use super::entity::{Address, Customer, Entity, EntityBase, Invoice, Item};
use super::transformer::extract_number;
use super::types::{EntityType, ValidationResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s\-\(\)\+\.]{7,21}$").expect("valid phone regex"));
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));
static DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").expect("valid datetime regex")
});
static POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{5}(-\d{4})?|[A-Za-z]\d[A-Za-z] \d[A-Za-z]\d|\d{4,10})$")
        .expect("valid postal code regex")
});

const ON_ERROR_VALUES: [&str; 2] = ["stopOnError", "continueOnError"];
const STATUS_SEVERITIES: [&str; 3] = ["Info", "Warn", "Error"];
const MAX_RETURNED_RANGE: std::ops::RangeInclusive<f64> = 1.0..=1000.0;

const NAME_LIMIT: usize = 31;
const DISPLAY_NAME_LIMIT: usize = 159;
const NOTES_LIMIT: usize = 4095;

/// Stateless validator for both message directions and for entities
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_request(&self, xml: &str, expected: Option<&EntityType>) -> ValidationResult {
        let mut result = ValidationResult::default();
        let Some(root) = Self::parse_root(xml, &mut result) else {
            return result;
        };

        let Some(msgs) = root.child("QBXMLMsgsRq") else {
            result.add_error("structure", "Missing QBXMLMsgsRq element", "MISSING_MSGS_RQ");
            return result;
        };
        if root.children_named("QBXMLMsgsRq").count() > 1 {
            result.add_error(
                "structure",
                "Document must contain a single QBXMLMsgsRq element",
                "MULTIPLE_MSGS_RQ",
            );
            return result;
        }

        if let Some(on_error) = msgs.attribute("onError")
            && !ON_ERROR_VALUES.contains(&on_error)
        {
            result.add_warning(
                "onError",
                "onError attribute should be \"stopOnError\" or \"continueOnError\"",
                "INVALID_ON_ERROR",
            );
        }

        let requests: Vec<&XmlElement> = msgs.children_with_suffix("Rq").collect();
        if requests.is_empty() {
            result.add_error("requests", "No request elements found", "NO_REQUESTS");
            return result;
        }

        for request in requests {
            self.check_request(request, expected, &mut result);
        }
        result
    }

    pub fn validate_response(
        &self,
        xml: &str,
        expected: Option<&EntityType>,
    ) -> ValidationResult {
        let mut result = ValidationResult::default();
        let Some(root) = Self::parse_root(xml, &mut result) else {
            return result;
        };

        let Some(msgs) = root.child("QBXMLMsgsRs") else {
            result.add_error("structure", "Missing QBXMLMsgsRs element", "MISSING_MSGS_RS");
            return result;
        };
        if root.children_named("QBXMLMsgsRs").count() > 1 {
            result.add_error(
                "structure",
                "Document must contain a single QBXMLMsgsRs element",
                "MULTIPLE_MSGS_RS",
            );
            return result;
        }

        let responses: Vec<&XmlElement> = msgs.children_with_suffix("Rs").collect();
        if responses.is_empty() {
            result.add_error("responses", "No response elements found", "NO_RESPONSES");
            return result;
        }

        for response in responses {
            self.check_response(response, expected, &mut result);
        }
        result
    }

    fn parse_root(xml: &str, result: &mut ValidationResult) -> Option<XmlElement> {
        match XmlElement::parse(xml) {
            Ok(root) if root.name == "QBXML" => Some(root),
            Ok(_) => {
                result.add_error("structure", "Missing QBXML root element", "MISSING_ROOT");
                None
            }
            Err(e) => {
                result.add_error("xml", format!("Invalid XML: {}", e), "INVALID_XML");
                None
            }
        }
    }

    fn check_request(
        &self,
        request: &XmlElement,
        expected: Option<&EntityType>,
        result: &mut ValidationResult,
    ) {
        Self::check_request_id(request, result);

        if let Some(expected) = expected {
            Self::check_entity_type(&request.name, expected, result);
        }

        if request.name.ends_with("QueryRq")
            && let Some(max_returned) = extract_number(request.value("MaxReturned"))
            && !MAX_RETURNED_RANGE.contains(&max_returned)
        {
            result.add_warning(
                "MaxReturned",
                "MaxReturned should be between 1 and 1000",
                "INVALID_MAX_RETURNED",
            );
        }
    }

    fn check_response(
        &self,
        response: &XmlElement,
        expected: Option<&EntityType>,
        result: &mut ValidationResult,
    ) {
        Self::check_request_id(response, result);

        if let Some(expected) = expected {
            Self::check_entity_type(&response.name, expected, result);
        }

        let status_code = response.attribute("statusCode").map(str::trim);
        match status_code {
            None | Some("") => result.add_error(
                "statusCode",
                format!("Missing statusCode attribute on {}", response.name),
                "MISSING_STATUS_CODE",
            ),
            Some("0") => {}
            Some(code) => result.add_warning(
                "response",
                format!(
                    "Response contains error {}: {}",
                    code,
                    response.attribute("statusMessage").unwrap_or("")
                ),
                "RESPONSE_ERROR",
            ),
        }

        match response.attribute("statusSeverity") {
            None | Some("") => result.add_error(
                "statusSeverity",
                "Missing statusSeverity attribute",
                "MISSING_STATUS_SEVERITY",
            ),
            Some(severity) if !STATUS_SEVERITIES.contains(&severity) => result.add_error(
                "statusSeverity",
                format!("Invalid statusSeverity value '{}'", severity),
                "INVALID_STATUS_SEVERITY",
            ),
            Some(_) => {}
        }

        if response.attribute("statusMessage").is_none() {
            result.add_error(
                "statusMessage",
                "Missing statusMessage attribute",
                "MISSING_STATUS_MESSAGE",
            );
        }
    }

    fn check_request_id(message: &XmlElement, result: &mut ValidationResult) {
        if message.attribute("requestID").is_none_or(str::is_empty) {
            result.add_warning(
                "requestID",
                format!("Missing requestID attribute on {}", message.name),
                "MISSING_REQUEST_ID",
            );
        }
    }

    fn check_entity_type(message_name: &str, expected: &EntityType, result: &mut ValidationResult) {
        let actual = EntityType::parse_message_name(message_name).map(|(entity, _)| entity);
        if actual.as_ref() != Some(expected) {
            result.add_error(
                "entityType",
                format!(
                    "Expected {} message but got {}",
                    expected,
                    actual
                        .as_ref()
                        .map(EntityType::as_str)
                        .unwrap_or(message_name)
                ),
                "ENTITY_TYPE_MISMATCH",
            );
        }
    }

    /// Entity-level pass over an already transformed entity
    pub fn validate_entity(&self, entity: &Entity) -> ValidationResult {
        let mut result = ValidationResult::default();
        match entity {
            Entity::Customer(customer) => self.check_customer(customer, &mut result),
            Entity::Item(item) => self.check_item(item, &mut result),
            Entity::Invoice(invoice) => self.check_invoice(invoice, &mut result),
            Entity::Generic(generic) => {
                self.check_base(&generic.base, &mut result);
                check_lengths(&[], &generic.base, &mut result);
            }
        }
        result
    }

    fn check_base(&self, base: &EntityBase, result: &mut ValidationResult) {
        for (field, value) in [
            ("createdAt", &base.created_at),
            ("modifiedAt", &base.modified_at),
        ] {
            if let Some(value) = value
                && !is_valid_datetime(value)
            {
                result.add_warning(field, format!("Invalid {} format", field), "INVALID_DATETIME");
            }
        }
    }

    fn check_customer(&self, customer: &Customer, result: &mut ValidationResult) {
        self.check_base(&customer.base, result);

        if let Some(email) = &customer.email
            && !EMAIL.is_match(email)
        {
            result.add_error("email", "Invalid email format", "INVALID_EMAIL");
        }

        if let Some(phone) = &customer.phone
            && !PHONE.is_match(phone)
        {
            result.add_warning("phone", "Phone number format may be invalid", "INVALID_PHONE");
        }

        if customer.credit_limit.is_some_and(|limit| limit < 0.0) {
            result.add_error(
                "creditLimit",
                "Credit limit cannot be negative",
                "NEGATIVE_CREDIT_LIMIT",
            );
        }

        if let Some(address) = &customer.bill_address {
            check_address(address, "billAddress", result);
        }
        if let Some(address) = &customer.ship_address {
            check_address(address, "shipAddress", result);
        }

        check_lengths(
            &[
                ("companyName", customer.company_name.as_deref(), 41),
                ("firstName", customer.first_name.as_deref(), 25),
                ("lastName", customer.last_name.as_deref(), 25),
                ("phone", customer.phone.as_deref(), 21),
                ("email", customer.email.as_deref(), 1023),
                ("accountNumber", customer.account_number.as_deref(), 99),
                ("notes", customer.notes.as_deref(), NOTES_LIMIT),
            ],
            &customer.base,
            result,
        );
    }

    fn check_item(&self, item: &Item, result: &mut ValidationResult) {
        self.check_base(&item.base, result);

        if item.quantity_on_hand.is_some_and(|qty| qty < 0.0) {
            result.add_warning("quantityOnHand", "Negative quantity on hand", "NEGATIVE_QTY");
        }

        let sales_or_purchase = item.sales_or_purchase.as_ref();
        if sales_or_purchase
            .and_then(|sop| sop.price)
            .is_some_and(|price| price < 0.0)
        {
            result.add_error("price", "Price cannot be negative", "NEGATIVE_PRICE");
        }

        check_lengths(
            &[(
                "salesOrPurchase.description",
                sales_or_purchase.and_then(|sop| sop.description.as_deref()),
                4095,
            )],
            &item.base,
            result,
        );
    }

    fn check_invoice(&self, invoice: &Invoice, result: &mut ValidationResult) {
        self.check_base(&invoice.base, result);

        if invoice.total_amount.is_some_and(|total| total < 0.0) {
            result.add_error("totalAmount", "Total amount cannot be negative", "NEGATIVE_TOTAL");
        }

        for (field, value) in [("txnDate", &invoice.txn_date), ("dueDate", &invoice.due_date)] {
            if let Some(value) = value
                && !is_valid_date(value)
            {
                result.add_error(field, format!("Invalid {} format", field), "INVALID_DATE");
            }
        }

        check_lengths(
            &[
                ("refNumber", invoice.ref_number.as_deref(), 11),
                ("poNumber", invoice.po_number.as_deref(), 25),
                ("fob", invoice.fob.as_deref(), 13),
                ("memo", invoice.memo.as_deref(), NOTES_LIMIT),
            ],
            &invoice.base,
            result,
        );
    }
}

fn check_address(address: &Address, field: &str, result: &mut ValidationResult) {
    if let Some(postal_code) = &address.postal_code
        && !POSTAL_CODE.is_match(postal_code)
    {
        result.add_warning(
            format!("{}.postalCode", field),
            "Invalid postal code format",
            "INVALID_POSTAL_CODE",
        );
    }

    if address.state.as_ref().is_some_and(|state| state.chars().count() > 3) {
        result.add_warning(
            format!("{}.state", field),
            "State should be 2-3 character abbreviation",
            "INVALID_STATE",
        );
    }
}

/// Length limits: the shared baseline plus type-specific fields. Always an error.
fn check_lengths(
    specific: &[(&str, Option<&str>, usize)],
    base: &EntityBase,
    result: &mut ValidationResult,
) {
    let baseline = [
        ("name", base.name.as_deref(), NAME_LIMIT),
        ("displayName", base.display_name.as_deref(), DISPLAY_NAME_LIMIT),
    ];

    for (field, value, limit) in baseline.iter().chain(specific) {
        if let Some(value) = value
            && value.chars().count() > *limit
        {
            result.add_error(
                *field,
                format!("Field '{}' exceeds maximum length of {} characters", field, limit),
                "FIELD_TOO_LONG",
            );
        }
    }
}

fn is_valid_date(value: &str) -> bool {
    DATE.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn is_valid_datetime(value: &str) -> bool {
    DATETIME.is_match(value)
        && (DateTime::parse_from_rfc3339(value).is_ok()
            || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok())
}
