//! Renders a `MonitoredQueue` as an AWS CloudFormation template.

use crate::monitored_queue::MonitoredQueue;
use crate::resources::{
    Alarm, DeadLetterSource, ForwardingFunction, Queue, ResourceRef, Subscription,
    SubscriptionEndpoint, Topic,
};
use serde_json::{json, Map, Value};

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
const BASIC_EXECUTION_POLICY: &str =
    "arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

impl MonitoredQueue {
    /// Builds the CloudFormation template describing every resource.
    pub fn to_template(&self, description: Option<&str>) -> Value {
        let mut resources = Map::new();

        if let DeadLetterSource::Provisioned(dlq) = &self.dead_letter_queue.queue {
            resources.insert(dlq.logical_id.clone(), queue_resource(dlq));
        }
        resources.insert(self.queue.logical_id.clone(), queue_resource(&self.queue));

        if let Topic::Provisioned { logical_id, options } = &self.topic {
            let mut properties = Map::new();
            insert_opt(&mut properties, "TopicName", options.topic_name.as_deref());
            insert_opt(&mut properties, "DisplayName", options.display_name.as_deref());
            resources.insert(
                logical_id.clone(),
                json!({ "Type": "AWS::SNS::Topic", "Properties": properties }),
            );
        }

        resources.insert(self.alarm.logical_id.clone(), alarm_resource(&self.alarm));

        for function in &self.functions {
            insert_function_resources(&mut resources, function);
        }

        for subscription in &self.subscriptions {
            insert_subscription_resources(&mut resources, subscription);
        }

        let mut template = Map::new();
        template.insert(
            "AWSTemplateFormatVersion".to_string(),
            Value::from(TEMPLATE_FORMAT_VERSION),
        );
        if let Some(description) = description {
            template.insert("Description".to_string(), Value::from(description));
        }
        template.insert("Resources".to_string(), Value::Object(resources));
        template.insert("Outputs".to_string(), self.outputs());
        Value::Object(template)
    }

    fn outputs(&self) -> Value {
        let queue_ref = ResourceRef::provisioned(&self.queue.logical_id);
        json!({
            "QueueUrl": { "Value": { "Ref": self.queue.logical_id } },
            "QueueArn": { "Value": queue_arn(&queue_ref) },
            "DeadLetterQueueArn": { "Value": queue_arn(&self.dead_letter_queue.reference()) },
            "AlarmName": { "Value": { "Ref": self.alarm.logical_id } },
            "TopicArn": { "Value": topic_arn(&self.topic.reference()) },
        })
    }
}

fn queue_resource(queue: &Queue) -> Value {
    let options = &queue.options;
    let mut properties = Map::new();
    properties.insert("QueueName".to_string(), Value::from(options.queue_name.as_str()));
    if options.fifo {
        properties.insert("FifoQueue".to_string(), Value::Bool(true));
        if options.content_based_deduplication {
            properties.insert("ContentBasedDeduplication".to_string(), Value::Bool(true));
        }
    }
    insert_opt(&mut properties, "VisibilityTimeout", options.visibility_timeout_seconds);
    insert_opt(&mut properties, "MessageRetentionPeriod", options.message_retention_seconds);
    insert_opt(&mut properties, "DelaySeconds", options.delay_seconds);
    insert_opt(
        &mut properties,
        "ReceiveMessageWaitTimeSeconds",
        options.receive_message_wait_time_seconds,
    );
    insert_opt(&mut properties, "MaximumMessageSize", options.max_message_size_bytes);

    if let Some(redrive) = &queue.redrive_policy {
        properties.insert(
            "RedrivePolicy".to_string(),
            json!({
                "deadLetterTargetArn": queue_arn(&redrive.dead_letter_target),
                "maxReceiveCount": redrive.max_receive_count,
            }),
        );
    }

    json!({
        "Type": "AWS::SQS::Queue",
        "UpdateReplacePolicy": "Delete",
        "DeletionPolicy": "Delete",
        "Properties": properties,
    })
}

fn alarm_resource(alarm: &Alarm) -> Value {
    let mut properties = Map::new();
    properties.insert("AlarmName".to_string(), Value::from(alarm.alarm_name.as_str()));
    insert_opt(&mut properties, "AlarmDescription", alarm.description.as_deref());
    properties.insert("Namespace".to_string(), Value::from(alarm.metric.namespace));
    properties.insert("MetricName".to_string(), Value::from(alarm.metric.metric_name));
    properties.insert(
        "Dimensions".to_string(),
        json!([{ "Name": "QueueName", "Value": queue_name(&alarm.metric.queue) }]),
    );
    properties.insert("Statistic".to_string(), Value::from(alarm.metric.statistic.as_str()));
    properties.insert("Period".to_string(), Value::from(alarm.metric.period_seconds));
    properties.insert("EvaluationPeriods".to_string(), Value::from(alarm.evaluation_periods));
    properties.insert("Threshold".to_string(), Value::from(alarm.threshold));
    properties.insert(
        "ComparisonOperator".to_string(),
        Value::from(alarm.comparison_operator.as_str()),
    );
    properties.insert(
        "TreatMissingData".to_string(),
        Value::from(alarm.treat_missing_data.as_str()),
    );
    properties.insert(
        "AlarmActions".to_string(),
        Value::Array(alarm.alarm_actions.iter().map(topic_arn).collect()),
    );
    properties.insert(
        "OKActions".to_string(),
        Value::Array(alarm.ok_actions.iter().map(topic_arn).collect()),
    );

    json!({ "Type": "AWS::CloudWatch::Alarm", "Properties": properties })
}

fn insert_function_resources(resources: &mut Map<String, Value>, function: &ForwardingFunction) {
    let role_id = function.role_logical_id();

    resources.insert(
        role_id.clone(),
        json!({
            "Type": "AWS::IAM::Role",
            "Properties": {
                "AssumeRolePolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": { "Service": "lambda.amazonaws.com" },
                        "Action": "sts:AssumeRole",
                    }],
                },
                "ManagedPolicyArns": [{ "Fn::Sub": BASIC_EXECUTION_POLICY }],
            },
        }),
    );

    resources.insert(
        function.logical_id.clone(),
        json!({
            "Type": "AWS::Lambda::Function",
            "DependsOn": [role_id],
            "Properties": {
                "Runtime": function.runtime,
                "Architectures": [function.architecture],
                "Handler": function.handler,
                "Code": { "S3Bucket": function.s3_bucket, "S3Key": function.s3_key },
                "MemorySize": function.memory_size_mb,
                "Timeout": function.timeout_seconds,
                "Role": { "Fn::GetAtt": [role_id, "Arn"] },
                "Environment": { "Variables": function.environment },
            },
        }),
    );

    resources.insert(
        function.log_group_logical_id(),
        json!({
            "Type": "AWS::Logs::LogGroup",
            "UpdateReplacePolicy": "Delete",
            "DeletionPolicy": "Delete",
            "Properties": {
                "LogGroupName": { "Fn::Sub": format!("/aws/lambda/${{{}}}", function.logical_id) },
                "RetentionInDays": function.log_retention_days,
            },
        }),
    );
}

fn insert_subscription_resources(resources: &mut Map<String, Value>, subscription: &Subscription) {
    let endpoint = match &subscription.endpoint {
        SubscriptionEndpoint::Email(address) => Value::from(address.as_str()),
        SubscriptionEndpoint::Lambda { function_logical_id } => {
            let function_arn = json!({ "Fn::GetAtt": [function_logical_id, "Arn"] });
            if let Some(permission_id) = subscription.permission_logical_id() {
                resources.insert(
                    permission_id,
                    json!({
                        "Type": "AWS::Lambda::Permission",
                        "Properties": {
                            "Action": "lambda:InvokeFunction",
                            "FunctionName": function_arn,
                            "Principal": "sns.amazonaws.com",
                            "SourceArn": topic_arn(&subscription.topic),
                        },
                    }),
                );
            }
            function_arn
        }
    };

    resources.insert(
        subscription.logical_id.clone(),
        json!({
            "Type": "AWS::SNS::Subscription",
            "Properties": {
                "Protocol": subscription.endpoint.protocol(),
                "TopicArn": topic_arn(&subscription.topic),
                "Endpoint": endpoint,
            },
        }),
    );
}

fn queue_arn(reference: &ResourceRef) -> Value {
    match reference {
        ResourceRef::Provisioned { logical_id } => json!({ "Fn::GetAtt": [logical_id, "Arn"] }),
        ResourceRef::Imported { arn, .. } => Value::from(arn.as_str()),
    }
}

fn queue_name(reference: &ResourceRef) -> Value {
    match reference {
        ResourceRef::Provisioned { logical_id } => {
            json!({ "Fn::GetAtt": [logical_id, "QueueName"] })
        }
        ResourceRef::Imported { name, .. } => Value::from(name.as_str()),
    }
}

/// `Ref` on an SNS topic yields its ARN.
fn topic_arn(reference: &ResourceRef) -> Value {
    match reference {
        ResourceRef::Provisioned { logical_id } => json!({ "Ref": logical_id }),
        ResourceRef::Imported { arn, .. } => Value::from(arn.as_str()),
    }
}

fn insert_opt<T: Into<Value>>(properties: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        properties.insert(key.to_string(), value.into());
    }
}
