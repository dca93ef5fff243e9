//! Service descriptors: the WSDL of the connector service and the `.qwc`
//! file the Web Connector imports.

use super::envelope::ConnectorCall;
use crate::env::namespace;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SERVICE_NAME: &str = "QBWebConnectorSvc";
const PORT_TYPE: &str = "QBWebConnectorSvcSoap";

/// Parameters of each method, in wire order; `receiveResponseXML` returns an int
fn method_signature(method: &str) -> (&'static [&'static str], &'static str) {
    match method {
        "authenticate" => (&["strUserName", "strPassword"], "xsd:string"),
        "receiveResponseXML" => (&["ticket", "response", "hresult", "message"], "xsd:int"),
        "connectionError" => (&["ticket", "hresult", "message"], "xsd:string"),
        _ => (&["ticket"], "xsd:string"),
    }
}

/// WSDL for the six-method service bound at `base_url`
pub fn wsdl_document(base_url: &str) -> String {
    let ns = namespace::WEB_CONNECTOR;
    let mut elements = String::new();
    let mut messages = String::new();
    let mut operations = String::new();
    let mut bindings = String::new();

    for method in ConnectorCall::METHODS {
        let (params, result_type) = method_signature(method);

        elements.push_str(&format!(
            "      <xsd:element name=\"{method}\">\n        <xsd:complexType>\n          <xsd:sequence>\n"
        ));
        for param in params {
            elements.push_str(&format!(
                "            <xsd:element name=\"{param}\" type=\"xsd:string\"/>\n"
            ));
        }
        elements.push_str("          </xsd:sequence>\n        </xsd:complexType>\n      </xsd:element>\n");
        elements.push_str(&format!(
            "      <xsd:element name=\"{method}Response\">\n        <xsd:complexType>\n          <xsd:sequence>\n            <xsd:element name=\"{method}Result\" type=\"{result_type}\"/>\n          </xsd:sequence>\n        </xsd:complexType>\n      </xsd:element>\n"
        ));

        messages.push_str(&format!(
            "  <message name=\"{method}Request\">\n    <part name=\"parameters\" element=\"tns:{method}\"/>\n  </message>\n  <message name=\"{method}Response\">\n    <part name=\"parameters\" element=\"tns:{method}Response\"/>\n  </message>\n"
        ));

        operations.push_str(&format!(
            "    <operation name=\"{method}\">\n      <input message=\"tns:{method}Request\"/>\n      <output message=\"tns:{method}Response\"/>\n    </operation>\n"
        ));

        bindings.push_str(&format!(
            "    <operation name=\"{method}\">\n      <soap:operation soapAction=\"{ns}{method}\" style=\"document\"/>\n      <input><soap:body use=\"literal\"/></input>\n      <output><soap:body use=\"literal\"/></output>\n    </operation>\n"
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
             xmlns:tns="{ns}"
             xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
             xmlns:xsd="http://www.w3.org/2001/XMLSchema"
             targetNamespace="{ns}"
             name="QBWebConnectorService">
  <types>
    <xsd:schema targetNamespace="{ns}">
{elements}    </xsd:schema>
  </types>
{messages}  <portType name="{PORT_TYPE}">
{operations}  </portType>
  <binding name="{PORT_TYPE}" type="tns:{PORT_TYPE}">
    <soap:binding transport="http://schemas.xmlsoap.org/soap/http"/>
{bindings}  </binding>
  <service name="{SERVICE_NAME}">
    <documentation>QuickBooks Web Connector Service</documentation>
    <port name="{PORT_TYPE}" binding="tns:{PORT_TYPE}">
      <soap:address location="{location}"/>
    </port>
  </service>
</definitions>
"#,
        location = escape(base_url),
    )
}

/// Deployment profile of the `.qwc` client configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QwcProfile {
    Dev,
    Staging,
    Prod,
}

struct ProfileSettings {
    display: &'static str,
    app_id: &'static str,
    file_id: &'static str,
    run_every_n_minutes: u32,
    begin_time: &'static str,
    end_time: &'static str,
    run_fri_sat: bool,
}

impl QwcProfile {
    pub const ALL: [QwcProfile; 3] = [QwcProfile::Dev, QwcProfile::Staging, QwcProfile::Prod];

    pub fn as_str(&self) -> &'static str {
        match self {
            QwcProfile::Dev => "dev",
            QwcProfile::Staging => "staging",
            QwcProfile::Prod => "prod",
        }
    }

    fn settings(&self) -> ProfileSettings {
        match self {
            QwcProfile::Dev => ProfileSettings {
                display: "Development",
                app_id: "{A1B2C3D4-E5F6-4789-ABCD-EF1234567890}",
                file_id: "{B2C3D4E5-F6A7-4890-BCDE-F23456789012}",
                run_every_n_minutes: 30,
                begin_time: "06:00:00",
                end_time: "22:00:00",
                run_fri_sat: true,
            },
            QwcProfile::Staging => ProfileSettings {
                display: "Staging",
                app_id: "{C2D3E4F5-A6B7-4901-8DEF-234567890123}",
                file_id: "{D3E4F5A6-B7C8-4012-9EF0-345678901234}",
                run_every_n_minutes: 60,
                begin_time: "07:00:00",
                end_time: "19:00:00",
                run_fri_sat: false,
            },
            QwcProfile::Prod => ProfileSettings {
                display: "Production",
                app_id: "{E4F5A6B7-C8D9-4123-A0F1-456789012345}",
                file_id: "{F5A6B7C8-D9E0-4234-B1A2-567890123456}",
                run_every_n_minutes: 60,
                begin_time: "08:00:00",
                end_time: "18:00:00",
                run_fri_sat: false,
            },
        }
    }

    pub fn app_unique_name(&self) -> String {
        format!("qbxml-relay-{}", self.as_str())
    }

    pub fn run_every_n_minutes(&self) -> u32 {
        self.settings().run_every_n_minutes
    }

    /// File name the profile is conventionally saved under
    pub fn file_name(&self) -> String {
        format!("{}.qwc", self.app_unique_name())
    }

    /// Render the `.qwc` document pointing the client at `app_url`
    pub fn qwc_document(&self, app_url: &str) -> String {
        let settings = self.settings();
        let minutes = settings.run_every_n_minutes;
        format!(
            r#"<?xml version="1.0"?>
<QBWCXML>
  <AppName>QBXML Relay Service ({display})</AppName>
  <AppID>{app_id}</AppID>
  <AppURL>{url}</AppURL>
  <AppDescription>QBXML relay service ({display} environment). Synchronizes QuickBooks data with a downstream system.</AppDescription>
  <AppDisplayName>QBXML Relay - {display}</AppDisplayName>
  <AppUniqueName>{unique}</AppUniqueName>
  <AppVersion>{version}</AppVersion>
  <Owner>QBXML Relay</Owner>
  <FileID>{file_id}</FileID>
  <QBType>QBFS</QBType>
  <Style>Document</Style>
  <UsingEvents>0</UsingEvents>
  <PersonalDataPref>pdpOptional</PersonalDataPref>
  <UnattendedModePref>umpOptional</UnattendedModePref>
  <AuthFlags>0x0</AuthFlags>
  <Notify>0</Notify>
  <IsReadOnly>0</IsReadOnly>
  <UpdatePolicy>automatic</UpdatePolicy>
  <RunEveryNMinutes>{minutes}</RunEveryNMinutes>
  <Scheduler>
    <RunEveryNMinutes>{minutes}</RunEveryNMinutes>
    <BeginTime>{begin}</BeginTime>
    <EndTime>{end}</EndTime>
    <MonTue>true</MonTue>
    <TueWed>true</TueWed>
    <WedThu>true</WedThu>
    <ThuFri>true</ThuFri>
    <FriSat>{fri_sat}</FriSat>
    <SatSun>false</SatSun>
    <SunMon>false</SunMon>
  </Scheduler>
</QBWCXML>
"#,
            display = settings.display,
            app_id = settings.app_id,
            url = escape(app_url),
            unique = self.app_unique_name(),
            version = env!("CARGO_PKG_VERSION"),
            file_id = settings.file_id,
            begin = settings.begin_time,
            end = settings.end_time,
            fri_sat = settings.run_fri_sat,
        )
    }
}

impl fmt::Display for QwcProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QwcProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(QwcProfile::Dev),
            "staging" => Ok(QwcProfile::Staging),
            "prod" | "production" => Ok(QwcProfile::Prod),
            other => Err(format!("unknown profile '{}'", other)),
        }
    }
}
