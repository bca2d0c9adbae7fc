//! IAM policies, roles and the policy document they share.
//!
//! Policy documents keep the service's PascalCase keys (`Statement`,
//! `Effect`, `Action`...). `Action`, `NotAction`, `Resource` and
//! `NotResource` accept a single string or a list and are normalized to a
//! list. `Principal`, `NotPrincipal` and `Condition` are free-form documents.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{at_most_one_of, exactly_one_of};
use crate::resource::value_objects::{Arn, Tags, check_tags};
use crate::resource::{ComputedProperties, ResourceAttributes, sorted_distinct, string_enum};
use crate::schema::{FieldDescriptor, Schema, SchemaCell, UnknownKeys};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TRUST_POLICY: &str = "the document is a trust policy";

/// Maximum rendered size of a managed policy document
pub const MAX_POLICY_DOCUMENT_SIZE: usize = 6144;

const NAME_PATTERN: &str = r"[\w+=,.@-]+";
const PATH_PATTERN: &str = r"/([\x21-\x7E]*/)?";

string_enum! {
    pub enum PolicyVersion {
        V2012 => "2012-10-17",
        V2008 => "2008-10-17",
    }
}

string_enum! {
    pub enum Effect {
        Allow => "Allow",
        Deny => "Deny",
    }
}

fn policy_document_schema(unknown_keys: UnknownKeys) -> SchemaResult<Schema> {
    let builder = |name: &str| match unknown_keys {
        UnknownKeys::Reject => Schema::strict(name),
        UnknownKeys::Ignore => Schema::lax(name),
    };
    let statement = builder("Statement")
        .field(FieldDescriptor::string("Sid").pattern("[A-Za-z0-9]*"))
        .field(FieldDescriptor::string("Effect").required().one_of(Effect::VALUES))
        .field(FieldDescriptor::string_list("Action").min_items(1))
        .field(FieldDescriptor::string_list("NotAction").min_items(1))
        .field(FieldDescriptor::string_list("Resource").min_items(1))
        .field(FieldDescriptor::string_list("NotResource").min_items(1))
        .field(FieldDescriptor::json("Principal"))
        .field(FieldDescriptor::json("NotPrincipal"))
        .field(FieldDescriptor::json("Condition"))
        .build()?;

    builder("PolicyDocument")
        .field(
            FieldDescriptor::string("Version")
                .one_of(PolicyVersion::VALUES)
                .default("2012-10-17"),
        )
        .field(FieldDescriptor::string("Id"))
        .field(
            FieldDescriptor::object_array("Statement", statement)
                .required()
                .min_items(1),
        )
        .build()
}

/// One statement of a policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_action: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_resource: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_principal: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl Statement {
    pub fn is_allow(&self) -> bool {
        self.effect == Effect::Allow
    }

    pub fn actions(&self) -> &[String] {
        self.action.as_deref().unwrap_or_default()
    }

    fn resources(&self) -> &[String] {
        self.resource.as_deref().unwrap_or_default()
    }

    pub fn allows_all_actions(&self) -> bool {
        self.is_allow() && self.actions().iter().any(|a| a == "*")
    }

    pub fn allows_all_resources(&self) -> bool {
        self.is_allow() && self.resources().iter().any(|r| r == "*")
    }

    /// Values of one principal type, e.g. `Service`. A bare `"*"` principal
    /// yields `"*"` for every type.
    pub fn principal_values(&self, principal_type: &str) -> Vec<String> {
        let values = match &self.principal {
            Some(Value::String(all)) => return vec![all.clone()],
            Some(Value::Object(map)) => map.get(principal_type),
            _ => None,
        };
        match values {
            Some(Value::String(value)) => vec![value.clone()],
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A parsed IAM policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: PolicyVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Statements paired with their attribute path under `attribute`.
    fn statements<'a>(
        &'a self,
        attribute: &'a str,
    ) -> impl Iterator<Item = (String, &'a Statement)> + 'a {
        self.statement
            .iter()
            .enumerate()
            .map(move |(i, statement)| (format!("{attribute}.Statement[{i}]"), statement))
    }

    pub fn statement_count(&self) -> usize {
        self.statement.len()
    }

    pub fn count_effect(&self, effect: Effect) -> usize {
        self.statement.iter().filter(|s| s.effect == effect).count()
    }

    /// Sorted distinct actions named by any statement.
    pub fn actions(&self) -> Vec<String> {
        sorted_distinct(self.statement.iter().flat_map(|s| s.actions()).map(String::as_str))
    }

    /// Sorted distinct service prefixes of the named actions.
    pub fn services(&self) -> Vec<String> {
        sorted_distinct(
            self.actions()
                .iter()
                .map(|action| action.split_once(':').map_or(action.as_str(), |(s, _)| s)),
        )
    }

    /// Compact JSON length of the document.
    pub fn rendered_size(&self) -> usize {
        serde_json::to_string(self).map_or(0, |rendered| rendered.len())
    }

    pub fn uses_conditions(&self) -> bool {
        self.statement.iter().any(|s| s.condition.is_some())
    }

    pub fn uses_not_action(&self) -> bool {
        self.statement.iter().any(|s| s.not_action.is_some())
    }
}

static POLICY_SCHEMA: SchemaCell = SchemaCell::new(|| {
    Schema::lax(IamPolicy::KIND)
        .field(FieldDescriptor::string("name").pattern(NAME_PATTERN).length(1, 128))
        .field(FieldDescriptor::string("name_prefix").pattern(NAME_PATTERN).length(1, 96))
        .field(FieldDescriptor::string("path").pattern(PATH_PATTERN).length(1, 512).default("/"))
        .field(FieldDescriptor::string("description").max_length(1000))
        .field(FieldDescriptor::object("policy", policy_document_schema(UnknownKeys::Ignore)?).required())
        .field(FieldDescriptor::tags())
        .build()
});

/// Attributes of an `aws_iam_policy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IamPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub policy: PolicyDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for IamPolicy {
    const KIND: &'static str = "aws_iam_policy";

    fn schema() -> SchemaResult<&'static Schema> {
        POLICY_SCHEMA.get()
    }

    fn validate(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        at_most_one_of(&[
            ("name", self.name.is_some()),
            ("name_prefix", self.name_prefix.is_some()),
        ])?;

        let mut sids: Vec<&str> = Vec::new();
        for (path, statement) in self.policy.statements("policy") {
            let action = format!("{path}.Action");
            let not_action = format!("{path}.NotAction");
            exactly_one_of(&[
                (action.as_str(), statement.action.is_some()),
                (not_action.as_str(), statement.not_action.is_some()),
            ])?;
            let resource = format!("{path}.Resource");
            let not_resource = format!("{path}.NotResource");
            exactly_one_of(&[
                (resource.as_str(), statement.resource.is_some()),
                (not_resource.as_str(), statement.not_resource.is_some()),
            ])?;
            if statement.principal.is_some() || statement.not_principal.is_some() {
                return Err(ValidationError::forbidden(
                    format!("{path}.Principal"),
                    "the document is an identity-based policy",
                ));
            }

            if let Some(sid) = statement.sid.as_deref().filter(|sid| !sid.is_empty()) {
                if sids.contains(&sid) {
                    return Err(ValidationError::duplicate("policy.Statement.Sid", sid));
                }
                sids.push(sid);
            }
        }

        let size = self.document_size();
        if size > MAX_POLICY_DOCUMENT_SIZE {
            return Err(ValidationError::cross_field(
                ["policy"],
                format!(
                    "rendered document is {size} characters, more than {MAX_POLICY_DOCUMENT_SIZE}"
                ),
            ));
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("statement_count", self.policy.statement_count())
            .with("allow_statement_count", self.policy.count_effect(Effect::Allow))
            .with("deny_statement_count", self.policy.count_effect(Effect::Deny))
            .with("actions", self.policy.actions())
            .with("services", self.policy.services())
            .with("allows_all_actions", self.allows_all_actions())
            .with("allows_all_resources", self.allows_all_resources())
            .with("is_admin_policy", self.is_admin_policy())
            .with("uses_not_action", self.policy.uses_not_action())
            .with("uses_conditions", self.policy.uses_conditions())
            .with("document_size", self.document_size())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.is_admin_policy() {
            warnings.push("Policy grants full administrative access (*:* on *)".to_string());
        }
        if self
            .policy
            .statement
            .iter()
            .any(|s| s.is_allow() && s.not_action.is_some())
        {
            warnings.push("Allow with NotAction grants every unlisted action".to_string());
        }
        warnings
    }
}

impl IamPolicy {
    pub fn allows_all_actions(&self) -> bool {
        self.policy.statement.iter().any(Statement::allows_all_actions)
    }

    pub fn allows_all_resources(&self) -> bool {
        self.policy.statement.iter().any(Statement::allows_all_resources)
    }

    /// Some Allow statement grants every action on every resource.
    pub fn is_admin_policy(&self) -> bool {
        self.policy
            .statement
            .iter()
            .any(|s| s.allows_all_actions() && s.allows_all_resources())
    }

    pub fn document_size(&self) -> usize {
        self.policy.rendered_size()
    }
}

static ROLE_SCHEMA: SchemaCell = SchemaCell::new(|| {
    Schema::strict(IamRole::KIND)
        .field(FieldDescriptor::string("name").pattern(NAME_PATTERN).length(1, 64))
        .field(FieldDescriptor::string("name_prefix").pattern(NAME_PATTERN).length(1, 38))
        .field(FieldDescriptor::string("path").pattern(PATH_PATTERN).length(1, 512).default("/"))
        .field(
            FieldDescriptor::object("assume_role_policy", policy_document_schema(UnknownKeys::Reject)?)
                .required(),
        )
        .field(
            FieldDescriptor::integer("max_session_duration")
                .range(3600, 43_200)
                .default(3600),
        )
        .field(FieldDescriptor::string("permissions_boundary"))
        .field(FieldDescriptor::string_array("managed_policy_arns").max_items(20))
        .field(FieldDescriptor::string("description").max_length(1000))
        .field(FieldDescriptor::boolean("force_detach_policies").default(false))
        .field(FieldDescriptor::tags())
        .build()
});

/// Attributes of an `aws_iam_role`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IamRole {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    pub path: String,
    pub assume_role_policy: PolicyDocument,
    /// Seconds
    pub max_session_duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions_boundary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed_policy_arns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub force_detach_policies: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for IamRole {
    const KIND: &'static str = "aws_iam_role";

    fn schema() -> SchemaResult<&'static Schema> {
        ROLE_SCHEMA.get()
    }

    fn validate(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        at_most_one_of(&[
            ("name", self.name.is_some()),
            ("name_prefix", self.name_prefix.is_some()),
        ])?;

        for (path, statement) in self.assume_role_policy.statements("assume_role_policy") {
            if statement.principal.is_none() {
                return Err(ValidationError::requires(
                    format!("{path}.Principal"),
                    TRUST_POLICY,
                ));
            }
            if statement.resource.is_some() {
                return Err(ValidationError::forbidden(format!("{path}.Resource"), TRUST_POLICY));
            }
            if statement.not_resource.is_some() {
                return Err(ValidationError::forbidden(
                    format!("{path}.NotResource"),
                    TRUST_POLICY,
                ));
            }
            if statement.action.is_none() {
                return Err(ValidationError::requires(format!("{path}.Action"), TRUST_POLICY));
            }
            if let Some(action) = statement.actions().iter().find(|a| !a.starts_with("sts:")) {
                return Err(ValidationError::cross_field(
                    [format!("{path}.Action")],
                    format!("trust policies only allow sts: actions, found '{action}'"),
                ));
            }
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("trusted_services", self.trusted_services())
            .with("trusted_accounts", self.trusted_accounts())
            .with("is_service_role", self.is_service_role())
            .with("allows_web_identity", self.allows_web_identity())
            .with("max_session_hours", self.max_session_hours())
            .with("managed_policy_count", self.managed_policy_count())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.trust_principals("AWS").iter().any(|p| p == "*") {
            warnings.push("Trust policy allows any AWS principal to assume the role".to_string());
        }
        warnings
    }
}

impl IamRole {
    fn allow_statements(&self) -> impl Iterator<Item = &Statement> {
        self.assume_role_policy
            .statement
            .iter()
            .filter(|statement| statement.is_allow())
    }

    fn trust_principals(&self, principal_type: &str) -> Vec<String> {
        self.allow_statements()
            .flat_map(|statement| statement.principal_values(principal_type))
            .collect()
    }

    /// Service principals, e.g. `lambda.amazonaws.com`.
    pub fn trusted_services(&self) -> Vec<String> {
        sorted_distinct(self.trust_principals("Service"))
    }

    /// Account ids of trusted AWS principals, from bare ids or principal ARNs.
    pub fn trusted_accounts(&self) -> Vec<String> {
        sorted_distinct(self.trust_principals("AWS").into_iter().filter_map(|principal| {
            if principal == "*" || principal.bytes().all(|b| b.is_ascii_digit()) {
                Some(principal)
            } else {
                Arn::parse("Principal", &principal)
                    .ok()
                    .map(|arn| arn.account().to_string())
                    .filter(|account| !account.is_empty())
            }
        }))
    }

    pub fn is_service_role(&self) -> bool {
        !self.trusted_services().is_empty() && self.trusted_accounts().is_empty()
    }

    pub fn allows_web_identity(&self) -> bool {
        self.allow_statements().any(|statement| {
            !statement.principal_values("Federated").is_empty()
                || statement
                    .actions()
                    .iter()
                    .any(|a| a == "sts:AssumeRoleWithWebIdentity")
        })
    }

    pub fn max_session_hours(&self) -> f64 {
        self.max_session_duration as f64 / 3600.0
    }

    pub fn managed_policy_count(&self) -> usize {
        self.managed_policy_arns.as_ref().map_or(0, Vec::len)
    }
}
