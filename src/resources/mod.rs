//! Attribute objects for each supported resource kind.
//!
//! Modules are grouped by service. Each defines one or more structs
//! implementing [`ResourceAttributes`](crate::resource::ResourceAttributes)
//! together with the enumerations and nested objects they use.

pub mod acmpca;
pub mod budgets;
pub mod cloudwatch;
pub mod dynamodb;
pub mod ec2;
pub mod ecs;
pub mod eks;
pub mod elasticache;
pub mod events;
pub mod firehose;
pub mod glue;
pub mod iam;
pub mod kinesis;
pub mod kms;
pub mod lambda;
pub mod rds;
pub mod s3;
pub mod secretsmanager;
pub mod sns;
pub mod sqs;

use crate::resource::ResourceRegistry;

/// Register every resource kind defined in this crate.
pub fn register_all(registry: &mut ResourceRegistry) {
    registry
        .register::<acmpca::CertificateAuthority>()
        .register::<budgets::Budget>()
        .register::<cloudwatch::LogGroup>()
        .register::<cloudwatch::MetricAlarm>()
        .register::<dynamodb::DynamoDbTable>()
        .register::<ec2::SecurityGroup>()
        .register::<ec2::Vpc>()
        .register::<ecs::EcsTaskDefinition>()
        .register::<eks::EksCluster>()
        .register::<elasticache::ReplicationGroup>()
        .register::<events::EventRule>()
        .register::<firehose::FirehoseDeliveryStream>()
        .register::<glue::GlueJob>()
        .register::<glue::GlueCatalogTable>()
        .register::<iam::IamPolicy>()
        .register::<iam::IamRole>()
        .register::<kinesis::KinesisStream>()
        .register::<kms::KmsKey>()
        .register::<lambda::LambdaFunction>()
        .register::<lambda::LambdaLayerVersion>()
        .register::<rds::RdsCluster>()
        .register::<s3::S3Bucket>()
        .register::<secretsmanager::Secret>()
        .register::<sns::SnsTopic>()
        .register::<sns::SnsTopicSubscription>()
        .register::<sqs::SqsQueue>();
}
