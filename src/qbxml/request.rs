//! Outbound QBXML request documents.

use super::types::{EntityType, Operation};
use crate::env;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActiveStatus {
    #[default]
    ActiveOnly,
    InactiveOnly,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchCriterion {
    #[default]
    StartsWith,
    Contains,
    EndsWith,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameFilter {
    pub name: String,
    pub match_criterion: MatchCriterion,
}

/// Filters applied to query requests
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilters {
    pub max_returned: Option<u32>,
    pub active_status: Option<ActiveStatus>,
    pub from_modified_date: Option<String>,
    pub to_modified_date: Option<String>,
    pub list_id: Option<String>,
    pub full_name: Option<String>,
    pub name_filter: Option<NameFilter>,
}

/// Builder for a single-message QBXML request document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QbxmlRequest {
    pub request_id: String,
    pub entity_type: EntityType,
    pub operation: Operation,
    pub filters: QueryFilters,
    pub stop_on_error: bool,
    pub version: String,
}

impl QbxmlRequest {
    pub fn query(entity_type: EntityType, request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            entity_type,
            operation: Operation::Query,
            filters: QueryFilters::default(),
            stop_on_error: true,
            version: env::qbxml::SPEC_VERSION.to_string(),
        }
    }

    pub fn with_filters(mut self, filters: QueryFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_max_returned(mut self, max_returned: u32) -> Self {
        self.filters.max_returned = Some(max_returned);
        self
    }

    pub fn continue_on_error(mut self) -> Self {
        self.stop_on_error = false;
        self
    }

    /// Message element name, e.g. `CustomerQueryRq`
    pub fn message_name(&self) -> String {
        format!("{}{}Rq", self.entity_type, self.operation)
    }

    pub fn to_xml(&self) -> String {
        let message = self.message_name();
        let on_error = if self.stop_on_error {
            "stopOnError"
        } else {
            "continueOnError"
        };

        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        xml.push_str(&format!("<?qbxml version=\"{}\"?>\n", self.version));
        xml.push_str("<QBXML>\n");
        xml.push_str(&format!("  <QBXMLMsgsRq onError=\"{}\">\n", on_error));
        xml.push_str(&format!(
            "    <{} requestID=\"{}\">\n",
            message,
            escape(self.request_id.as_str())
        ));
        for (tag, value) in self.filter_elements() {
            xml.push_str(&format!("      <{tag}>{value}</{tag}>\n"));
        }
        xml.push_str(&format!("    </{}>\n", message));
        xml.push_str("  </QBXMLMsgsRq>\n");
        xml.push_str("</QBXML>\n");
        xml
    }

    fn filter_elements(&self) -> Vec<(&'static str, String)> {
        let filters = &self.filters;
        let mut elements = Vec::new();

        // Element order follows the query message schema
        if let Some(list_id) = &filters.list_id {
            elements.push(("ListID", escape(list_id.as_str()).into_owned()));
        }
        if let Some(full_name) = &filters.full_name {
            elements.push(("FullName", escape(full_name.as_str()).into_owned()));
        }
        if let Some(max_returned) = filters.max_returned {
            elements.push(("MaxReturned", max_returned.to_string()));
        }
        if let Some(status) = filters.active_status {
            elements.push(("ActiveStatus", format!("{:?}", status)));
        }
        if let Some(from) = &filters.from_modified_date {
            elements.push(("FromModifiedDate", escape(from.as_str()).into_owned()));
        }
        if let Some(to) = &filters.to_modified_date {
            elements.push(("ToModifiedDate", escape(to.as_str()).into_owned()));
        }
        if let Some(name_filter) = &filters.name_filter {
            elements.push((
                "NameFilter",
                format!(
                    "<MatchCriterion>{:?}</MatchCriterion><Name>{}</Name>",
                    name_filter.match_criterion,
                    escape(name_filter.name.as_str())
                ),
            ));
        }
        elements
    }
}
