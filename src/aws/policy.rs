//! IAM policy documents.
//!
//! Every document the CLI sends to IAM is built here from a fixed shape,
//! parameterized only by resource names, the region, and the account id.

use serde::{Deserialize, Serialize};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const ASSUME_ROLE_ACTION: &str = "sts:AssumeRole";
pub const LAMBDA_SERVICE: &str = "lambda.amazonaws.com";
pub const S3_SERVICE: &str = "s3.amazonaws.com";
pub const LAMBDA_BASIC_EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Statement")]
    pub statement: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub action: OneOrMany,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<OneOrMany>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Principal {
    #[serde(rename = "Service")]
    Service(OneOrMany),
    #[serde(rename = "AWS")]
    Aws(OneOrMany),
}

/// IAM accepts either a bare string or a list wherever a value may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn many<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OneOrMany::Many(values.into_iter().map(Into::into).collect())
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            OneOrMany::One(value) => vec![value.as_str()],
            OneOrMany::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for OneOrMany {
    fn from(value: &str) -> Self {
        OneOrMany::One(value.to_string())
    }
}

impl From<String> for OneOrMany {
    fn from(value: String) -> Self {
        OneOrMany::One(value)
    }
}

impl Statement {
    fn allow(action: impl Into<OneOrMany>) -> Self {
        Self {
            sid: None,
            effect: Effect::Allow,
            principal: None,
            action: action.into(),
            resource: None,
        }
    }

    fn with_sid(mut self, sid: &str) -> Self {
        self.sid = Some(sid.to_string());
        self
    }

    fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    fn with_resource(mut self, resource: impl Into<OneOrMany>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }

    /// Trust policy letting the given AWS services assume a role.
    pub fn service_trust(services: OneOrMany) -> Self {
        Self::new(vec![
            Statement::allow(ASSUME_ROLE_ACTION).with_principal(Principal::Service(services))
        ])
    }

    /// Trust policy for a team role: Lambda and S3 may assume it.
    pub fn team_role_trust() -> Self {
        Self::service_trust(OneOrMany::many([LAMBDA_SERVICE, S3_SERVICE]))
    }

    /// Trust policy for a Lambda execution role.
    pub fn lambda_execution_trust() -> Self {
        Self::service_trust(OneOrMany::from(LAMBDA_SERVICE))
    }

    /// Trust policy letting one IAM user assume the role.
    pub fn user_trust(user_arn: &str) -> Self {
        Self::new(vec![Statement::allow(ASSUME_ROLE_ACTION)
            .with_principal(Principal::Aws(OneOrMany::from(user_arn)))])
    }

    /// Identity policy allowing its holder to assume `role_arn`.
    pub fn allow_assume_role(role_arn: &str) -> Self {
        Self::new(vec![
            Statement::allow(ASSUME_ROLE_ACTION).with_resource(role_arn)
        ])
    }

    /// Full access to one bucket plus console listing.
    pub fn s3_bucket_access(bucket_name: &str) -> Self {
        Self::new(vec![
            Statement::allow(OneOrMany::many([
                "s3:ListAllMyBuckets",
                "s3:GetBucketLocation",
            ]))
            .with_sid("AllowListingBucketsInConsole")
            .with_resource("*"),
            Statement::allow("s3:*").with_resource(OneOrMany::many(bucket_arns(bucket_name))),
        ])
    }

    /// Full access to one function plus read-only listing.
    pub fn lambda_function_access(region: &str, account_id: &str, function_name: &str) -> Self {
        Self::new(vec![
            Statement::allow(OneOrMany::many(["lambda:ListFunctions", "lambda:GetFunction"]))
                .with_sid("AllowListingLambdaFunctions")
                .with_resource("*"),
            Statement::allow("lambda:*")
                .with_resource(lambda_function_arn(region, account_id, function_name)),
        ])
    }

    /// Full access to one queue plus queue listing.
    pub fn sqs_queue_access(region: &str, account_id: &str, queue_name: &str) -> Self {
        Self::new(vec![
            Statement::allow(OneOrMany::many(["sqs:ListQueues"])).with_resource("*"),
            Statement::allow("sqs:*").with_resource(sqs_queue_arn(region, account_id, queue_name)),
        ])
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub fn bucket_arns(bucket_name: &str) -> [String; 2] {
    [
        format!("arn:aws:s3:::{}", bucket_name),
        format!("arn:aws:s3:::{}/*", bucket_name),
    ]
}

pub fn role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{}:role/{}", account_id, role_name)
}

pub fn lambda_function_arn(region: &str, account_id: &str, function_name: &str) -> String {
    format!(
        "arn:aws:lambda:{}:{}:function:{}",
        region, account_id, function_name
    )
}

pub fn sqs_queue_arn(region: &str, account_id: &str, queue_name: &str) -> String {
    format!("arn:aws:sqs:{}:{}:{}", region, account_id, queue_name)
}

/// Name of the execution role created for a team's Lambda functions.
pub fn lambda_execution_role_name(team: &str) -> String {
    format!("{}-lambda-execution", team)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn as_value(doc: &PolicyDocument) -> Value {
        serde_json::from_str(&doc.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_team_role_trust_shape() {
        let value = as_value(&PolicyDocument::team_role_trust());
        assert_eq!(
            value,
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": {"Service": ["lambda.amazonaws.com", "s3.amazonaws.com"]},
                    "Action": "sts:AssumeRole"
                }]
            })
        );
    }

    #[test]
    fn test_lambda_execution_trust_uses_scalar_service() {
        let value = as_value(&PolicyDocument::lambda_execution_trust());
        assert_eq!(
            value["Statement"][0]["Principal"],
            json!({"Service": "lambda.amazonaws.com"})
        );
    }

    #[test]
    fn test_user_trust_names_the_user() {
        let value = as_value(&PolicyDocument::user_trust(
            "arn:aws:iam::123456789012:user/Karp",
        ));
        assert_eq!(
            value["Statement"][0]["Principal"],
            json!({"AWS": "arn:aws:iam::123456789012:user/Karp"})
        );
        assert!(value["Statement"][0].get("Resource").is_none());
    }

    #[test]
    fn test_allow_assume_role_targets_role() {
        let value = as_value(&PolicyDocument::allow_assume_role(
            "arn:aws:iam::123456789012:role/Karp",
        ));
        assert_eq!(
            value["Statement"][0],
            json!({
                "Effect": "Allow",
                "Action": "sts:AssumeRole",
                "Resource": "arn:aws:iam::123456789012:role/Karp"
            })
        );
    }

    #[test]
    fn test_s3_bucket_access_shape() {
        let value = as_value(&PolicyDocument::s3_bucket_access("karp-assets"));
        assert_eq!(
            value,
            json!({
                "Version": "2012-10-17",
                "Statement": [
                    {
                        "Sid": "AllowListingBucketsInConsole",
                        "Effect": "Allow",
                        "Action": ["s3:ListAllMyBuckets", "s3:GetBucketLocation"],
                        "Resource": "*"
                    },
                    {
                        "Effect": "Allow",
                        "Action": "s3:*",
                        "Resource": ["arn:aws:s3:::karp-assets", "arn:aws:s3:::karp-assets/*"]
                    }
                ]
            })
        );
    }

    #[test]
    fn test_lambda_and_sqs_access_scope_to_account_and_region() {
        let lambda = PolicyDocument::lambda_function_access("us-east-1", "123456789012", "resize");
        assert_eq!(
            lambda.statement[1].resource,
            Some(OneOrMany::from(
                "arn:aws:lambda:us-east-1:123456789012:function:resize"
            ))
        );

        let sqs = PolicyDocument::sqs_queue_access("us-east-1", "123456789012", "jobs");
        assert_eq!(
            sqs.statement[1].resource.as_ref().map(OneOrMany::values),
            Some(vec!["arn:aws:sqs:us-east-1:123456789012:jobs"])
        );
        assert_eq!(sqs.statement[0].action.values(), vec!["sqs:ListQueues"]);
    }

    #[test]
    fn test_documents_survive_json_round_trip() {
        let documents = [
            PolicyDocument::team_role_trust(),
            PolicyDocument::lambda_execution_trust(),
            PolicyDocument::user_trust("arn:aws:iam::123456789012:user/Prisere"),
            PolicyDocument::allow_assume_role("arn:aws:iam::123456789012:role/Prisere"),
            PolicyDocument::s3_bucket_access("prisere-uploads"),
            PolicyDocument::lambda_function_access("us-east-1", "123456789012", "notify"),
            PolicyDocument::sqs_queue_access("us-east-1", "123456789012", "events"),
        ];

        for document in documents {
            let json = document.to_json().unwrap();
            let parsed: PolicyDocument = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, document, "round trip changed {}", json);
        }
    }

    #[test]
    fn test_role_names_and_arns() {
        assert_eq!(lambda_execution_role_name("Karp"), "Karp-lambda-execution");
        assert_eq!(
            role_arn("123456789012", "Karp-lambda-execution"),
            "arn:aws:iam::123456789012:role/Karp-lambda-execution"
        );
    }
}
