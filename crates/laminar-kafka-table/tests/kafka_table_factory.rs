//! End-to-end resolution of Kafka tables into source and sink specs.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow_schema::DataType;

use laminar_kafka_table::config::TableOptions;
use laminar_kafka_table::format::ChangelogMode;
use laminar_kafka_table::kafka::{
    DeliveryGuarantee, KafkaPartitioner, KafkaTableFactory, PartitionerRegistry,
    PartitionerSpec, ProjectionIndices, SinkBufferFlushMode, StartupMode, StartupOffsets,
    TopicPartition, TopicSelection,
};
use laminar_kafka_table::schema::{project_row_type, row_fields, Column, TableSchema};
use laminar_kafka_table::testing::{
    key_value_options, sink_options, source_options, test_registry, test_schema,
    test_schema_with_metadata, test_table, with_options,
};
use laminar_kafka_table::{ConnectorError, SinkSpec, SourceSpec};

fn factory() -> KafkaTableFactory {
    KafkaTableFactory::new(test_registry())
}

fn source(schema: TableSchema, options: TableOptions) -> Result<SourceSpec, ConnectorError> {
    factory().create_source(&test_table(schema, options))
}

fn sink(schema: TableSchema, options: TableOptions) -> Result<SinkSpec, ConnectorError> {
    factory().create_sink(&test_table(schema, options))
}

fn field_names(row_type: &DataType) -> Vec<String> {
    row_fields(row_type)
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

// ── Source ──

#[test]
fn test_table_source() {
    let spec = source(test_schema(), source_options()).unwrap();

    assert_eq!(
        spec.topics(),
        &TopicSelection::Topics(vec!["myTopic".to_string()])
    );
    assert_eq!(
        spec.properties(),
        &props(&[
            ("bootstrap.servers", "dummy"),
            ("group.id", "dummy"),
            ("partition.discovery.interval.ms", "1000"),
        ])
    );

    let mut offsets = BTreeMap::new();
    offsets.insert(TopicPartition::new("myTopic", 0), 100);
    offsets.insert(TopicPartition::new("myTopic", 1), 123);
    assert_eq!(spec.startup_offsets(), &StartupOffsets::SpecificOffsets(offsets));

    let value = spec.value_format();
    assert_eq!(value.identifier(), "test-format");
    assert_eq!(value.option_prefix(), "");
    assert_eq!(
        value.options(),
        &props(&[("delimiter", ","), ("fail-on-missing", "true")])
    );
    assert_eq!(value.projected_data_type(), spec.physical_data_type());
    assert!(spec.key_format().is_none());

    assert_eq!(spec.projection(), &ProjectionIndices::new(vec![], vec![0, 1, 2]));
    assert_eq!(field_names(spec.physical_data_type()), vec!["name", "count", "time"]);
    assert_eq!(spec.produced_data_type(), spec.physical_data_type());
    assert!(spec.metadata_keys().is_empty());
    assert!(spec.watermark().is_some());
    assert!(spec.commit_offsets_on_checkpoint());
}

#[test]
fn test_resolution_is_idempotent() {
    let first = source(test_schema(), source_options()).unwrap();
    let second = source(test_schema(), source_options()).unwrap();
    assert_eq!(first, second);

    let first = sink(test_schema(), key_value_options()).unwrap();
    let second = sink(test_schema(), key_value_options()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_source_commit_on_checkpoint_requires_group_id() {
    let options = with_options(source_options(), &[("properties.group.id", "")]);
    let spec = source(test_schema(), options).unwrap();
    assert!(!spec.commit_offsets_on_checkpoint());
}

#[test]
fn test_table_source_with_pattern() {
    let options = with_options(
        source_options(),
        &[
            ("topic", ""),
            ("topic-pattern", "myTopic-\\d+"),
            ("scan.startup.mode", "earliest-offset"),
            ("scan.startup.specific-offsets", ""),
        ],
    );
    let spec = source(test_schema(), options).unwrap();

    assert!(matches!(spec.topics(), TopicSelection::Pattern(p) if p.as_str() == "myTopic-\\d+"));
    assert!(spec.topics().includes("myTopic-1"));
    assert!(!spec.topics().includes("otherTopic-1"));
    assert_eq!(spec.startup_offsets(), &StartupOffsets::Earliest);
}

#[test]
fn test_table_source_with_topic_list() {
    let options = with_options(
        source_options(),
        &[
            ("topic", "a;b;c"),
            ("scan.startup.mode", "timestamp"),
            ("scan.startup.timestamp-millis", "1650000000000"),
        ],
    );
    let spec = source(test_schema(), options).unwrap();
    assert_eq!(
        spec.topics(),
        &TopicSelection::Topics(vec!["a".into(), "b".into(), "c".into()])
    );
    assert_eq!(
        spec.startup_offsets(),
        &StartupOffsets::Timestamp(1_650_000_000_000)
    );
}

#[test]
fn test_table_source_with_key_value() {
    let spec = source(test_schema(), key_value_options()).unwrap();

    let key = spec.key_format().unwrap();
    assert_eq!(key.option_prefix(), "key.");
    assert_eq!(key.options(), &props(&[("delimiter", "#")]));
    assert_eq!(field_names(key.projected_data_type()), vec!["name"]);

    let value = spec.value_format();
    assert_eq!(value.option_prefix(), "value.");
    assert_eq!(value.options(), &props(&[("delimiter", "|")]));
    assert_eq!(field_names(value.projected_data_type()), vec!["count", "time"]);

    assert_eq!(spec.projection(), &ProjectionIndices::new(vec![0], vec![1, 2]));
    assert_eq!(spec.startup_offsets().mode(), StartupMode::GroupOffsets);
}

#[test]
fn test_table_source_with_metadata() {
    let options = with_options(
        key_value_options(),
        &[(
            "value.test-format.readable-metadata",
            "metadata_1:INT, metadata_2:STRING",
        )],
    );
    let spec = source(test_schema_with_metadata(), options).unwrap();

    let value = spec.value_format();
    assert_eq!(field_names(value.projected_data_type()), vec!["count", "metadata_2"]);
    assert_eq!(value.metadata_keys(), ["metadata_2".to_string()]);
    assert_eq!(spec.metadata_keys(), ["timestamp".to_string()]);
    assert_eq!(spec.projection(), &ProjectionIndices::new(vec![0], vec![1]));
    assert_eq!(
        field_names(spec.produced_data_type()),
        vec!["name", "count", "time", "metadata"]
    );

    let readable: Vec<String> = spec
        .list_readable_metadata()
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    assert_eq!(&readable[..2], ["value.metadata_1", "value.metadata_2"]);
    assert!(readable.contains(&"leader-epoch".to_string()));
}

#[test]
fn test_table_source_with_shared_metadata_keys() {
    let schema = TableSchema::new(vec![
        Column::physical("name", DataType::Utf8),
        Column::physical("count", DataType::Decimal128(38, 18)),
        Column::metadata("m1", DataType::Utf8, Some("value.metadata_2"), false),
        Column::metadata("t1", DataType::Int64, Some("timestamp"), false),
        Column::metadata("m2", DataType::Utf8, Some("value.metadata_2"), false),
        Column::metadata("t2", DataType::Int64, Some("timestamp"), false),
    ]);
    let options = with_options(
        key_value_options(),
        &[(
            "value.test-format.readable-metadata",
            "metadata_1:INT, metadata_2:STRING",
        )],
    );
    let spec = source(schema, options).unwrap();

    let value = spec.value_format();
    assert_eq!(field_names(value.projected_data_type()), vec!["count", "metadata_2"]);
    assert_eq!(value.metadata_keys(), ["metadata_2".to_string()]);
    assert_eq!(spec.metadata_keys(), ["timestamp".to_string()]);
    assert_eq!(
        field_names(spec.produced_data_type()),
        vec!["name", "count", "m1", "t1", "m2", "t2"]
    );
}

#[test]
fn test_source_decoders_use_projected_types() {
    let spec = source(test_schema(), key_value_options()).unwrap();
    let decoders = spec.create_decoders().unwrap();

    let key = decoders.key.unwrap();
    assert_eq!(key.schema().fields(), &row_fields(spec.key_format().unwrap().projected_data_type()));
    assert_eq!(
        decoders.value.schema().fields(),
        &row_fields(spec.value_format().projected_data_type())
    );
}

#[test]
fn test_source_key_prefix_is_stripped() {
    let schema = TableSchema::new(vec![
        Column::physical("k_id", DataType::Int64),
        Column::physical("name", DataType::Utf8),
    ]);
    let options = with_options(
        key_value_options(),
        &[("key.fields", "k_id"), ("key.fields-prefix", "k_")],
    );
    let spec = source(schema, options).unwrap();
    assert_eq!(spec.key_prefix(), Some("k_"));
    assert_eq!(
        field_names(spec.key_format().unwrap().projected_data_type()),
        vec!["id"]
    );
    assert_eq!(field_names(spec.value_format().projected_data_type()), vec!["name"]);
}

fn fields_of(row_type: &DataType, strip: &str) -> Vec<(String, DataType)> {
    row_fields(row_type)
        .iter()
        .map(|f| {
            let name = f.name().strip_prefix(strip).unwrap_or(f.name());
            (name.to_string(), f.data_type().clone())
        })
        .collect()
}

#[test]
fn test_projection_indices_reproduce_format_types() {
    let schema = TableSchema::new(vec![
        Column::physical("k_id", DataType::Int64),
        Column::physical("k_region", DataType::Utf8),
        Column::physical("name", DataType::Utf8),
        Column::physical("count", DataType::Int32),
    ]);
    let physical = schema.physical_row_type();
    let cases: [&[(&str, &str)]; 5] = [
        &[("key.fields", "k_id")],
        &[("key.fields", "k_region;k_id")],
        &[("key.fields", "k_id;k_region"), ("value.fields-include", "ALL")],
        &[("key.fields", "k_id"), ("key.fields-prefix", "k_")],
        &[("key.fields", "k_region;k_id"), ("key.fields-prefix", "k_")],
    ];

    for pairs in cases {
        let options = with_options(key_value_options(), pairs);
        let prefix = options.get("key.fields-prefix").unwrap_or("").to_string();

        let spec = source(schema.clone(), options.clone()).unwrap();
        let indices = spec.projection();
        assert_eq!(
            fields_of(spec.key_format().unwrap().projected_data_type(), ""),
            fields_of(&project_row_type(&physical, &indices.key), &prefix),
            "key type for {pairs:?}"
        );
        assert_eq!(
            spec.value_format().projected_data_type(),
            &project_row_type(&physical, &indices.value),
            "value type for {pairs:?}"
        );

        let spec = sink(schema.clone(), options).unwrap();
        assert_eq!(spec.projection(), indices);
        assert_eq!(
            spec.value_format().projected_data_type(),
            &project_row_type(&physical, &spec.projection().value),
            "sink value type for {pairs:?}"
        );
    }
}

// ── Sink ──

#[test]
fn test_table_sink() {
    let spec = sink(test_schema(), sink_options()).unwrap();

    assert_eq!(spec.topic(), "myTopic");
    assert_eq!(
        spec.properties(),
        &props(&[("bootstrap.servers", "dummy"), ("group.id", "dummy")])
    );
    assert_eq!(spec.partitioner().spec(), &PartitionerSpec::Fixed);
    assert_eq!(spec.delivery_guarantee(), DeliveryGuarantee::ExactlyOnce);
    assert_eq!(spec.transactional_id_prefix(), Some("kafka-sink"));
    assert_eq!(spec.parallelism(), None);
    assert_eq!(spec.buffer_flush(), SinkBufferFlushMode::DISABLED);
    assert_eq!(spec.value_format().options(), &props(&[("delimiter", ",")]));
    assert_eq!(spec.consumed_data_type(), spec.physical_data_type());
    assert!(spec.key_format().is_none());
}

#[test]
fn test_table_sink_with_parallelism() {
    let options = with_options(sink_options(), &[("sink.parallelism", "100")]);
    let spec = sink(test_schema(), options).unwrap();
    assert_eq!(spec.parallelism(), Some(100));
}

#[test]
fn test_table_sink_semantic_translation() {
    for (semantic, guarantee) in [
        ("exactly-once", DeliveryGuarantee::ExactlyOnce),
        ("at-least-once", DeliveryGuarantee::AtLeastOnce),
        ("none", DeliveryGuarantee::None),
    ] {
        let options = with_options(
            sink_options(),
            &[("sink.delivery-guarantee", ""), ("sink.semantic", semantic)],
        );
        let spec = sink(test_schema(), options).unwrap();
        assert_eq!(spec.delivery_guarantee(), guarantee);
    }
}

#[test]
fn test_table_sink_with_key_value() {
    let spec = sink(test_schema(), key_value_options()).unwrap();

    assert_eq!(
        field_names(spec.key_format().unwrap().projected_data_type()),
        vec!["name"]
    );
    assert_eq!(
        field_names(spec.value_format().projected_data_type()),
        vec!["count", "time"]
    );
    assert_eq!(spec.projection(), &ProjectionIndices::new(vec![0], vec![1, 2]));
    assert!(!spec.properties().contains_key("partition.discovery.interval.ms"));

    let encoders = spec.create_encoders().unwrap();
    assert!(encoders.key.is_some());
}

#[test]
fn test_table_sink_with_buffer_flush() {
    let options = with_options(
        sink_options(),
        &[
            ("sink.buffer-flush.max-rows", "100"),
            ("sink.buffer-flush.interval", "1 s"),
        ],
    );
    let spec = sink(test_schema(), options).unwrap();
    assert!(spec.buffer_flush().is_enabled());
    assert_eq!(spec.buffer_flush().batch_size, 100);
}

#[test]
fn test_table_sink_with_metadata() {
    let schema = TableSchema::new(vec![
        Column::physical("name", DataType::Utf8),
        Column::metadata("ts", DataType::Int64, Some("timestamp"), false),
        Column::metadata("offset", DataType::Int64, None, true),
        Column::metadata("m", DataType::Utf8, Some("value.metadata_2"), false),
    ]);
    let options = with_options(
        sink_options(),
        &[("test-format.writable-metadata", "metadata_2:STRING")],
    );
    let spec = sink(schema, options).unwrap();

    assert_eq!(spec.metadata_keys(), ["timestamp".to_string()]);
    assert_eq!(spec.value_format().metadata_keys(), ["metadata_2".to_string()]);
    assert_eq!(
        field_names(spec.value_format().projected_data_type()),
        vec!["name", "metadata_2"]
    );
    assert_eq!(field_names(spec.consumed_data_type()), vec!["name", "ts", "m"]);
}

#[test]
fn test_table_sink_with_registered_partitioner() {
    struct Zero;
    impl KafkaPartitioner for Zero {
        fn partition(&mut self, _key: Option<&[u8]>, _num_partitions: i32) -> Option<i32> {
            Some(0)
        }
    }

    let partitioners = PartitionerRegistry::new();
    partitioners.register("com.example.Zero", Arc::new(|| Box::new(Zero) as Box<dyn KafkaPartitioner>));
    let factory = KafkaTableFactory::new(test_registry()).with_partitioners(partitioners);

    let options = with_options(sink_options(), &[("sink.partitioner", "com.example.Zero")]);
    let spec = factory
        .create_sink(&test_table(test_schema(), options))
        .unwrap();
    assert_eq!(
        spec.partitioner().spec(),
        &PartitionerSpec::Custom("com.example.Zero".into())
    );
    assert_eq!(spec.partitioner().create().partition(None, 4), Some(0));
}

// ── Schema registry subjects ──

fn subject_options(pairs: &[(&str, &str)]) -> TableOptions {
    let mut options: TableOptions = [
        ("connector", "kafka"),
        ("topic", "myTopic"),
        ("properties.bootstrap.servers", "dummy"),
    ]
    .into_iter()
    .collect();
    for (k, v) in pairs {
        options.set(*k, *v);
    }
    options
}

fn subjects(options: TableOptions) -> (Option<String>, Option<String>) {
    let spec = sink(test_schema(), options).unwrap();
    let value = spec.value_format().options().get("subject").cloned();
    let key = spec
        .key_format()
        .and_then(|k| k.options().get("subject").cloned());
    (value, key)
}

#[test]
fn test_subject_matrix() {
    let value = Some("myTopic-value".to_string());
    let key = Some("myTopic-key".to_string());

    assert_eq!(
        subjects(subject_options(&[("format", "debezium-avro-confluent")])),
        (value.clone(), None)
    );
    assert_eq!(
        subjects(subject_options(&[
            ("value.format", "avro-confluent"),
            ("key.format", "avro-confluent"),
            ("key.fields", "name"),
        ])),
        (value.clone(), key.clone())
    );
    assert_eq!(
        subjects(subject_options(&[
            ("value.format", "avro-confluent"),
            ("key.format", "csv"),
            ("key.fields", "name"),
        ])),
        (value, None)
    );
    assert_eq!(
        subjects(subject_options(&[
            ("value.format", "json"),
            ("key.format", "avro-confluent"),
            ("key.fields", "name"),
        ])),
        (None, key)
    );
}

#[test]
fn test_explicit_subject_overrides_default() {
    assert_eq!(
        subjects(subject_options(&[
            ("value.format", "avro-confluent"),
            ("value.avro-confluent.subject", "sub1"),
            ("key.format", "avro-confluent"),
            ("key.avro-confluent.subject", "sub2"),
            ("key.fields", "name"),
        ])),
        (Some("sub1".to_string()), Some("sub2".to_string()))
    );
    assert_eq!(
        subjects(subject_options(&[
            ("format", "debezium-avro-confluent"),
            ("debezium-avro-confluent.subject", "sub1"),
        ])),
        (Some("sub1".to_string()), None)
    );
    assert_eq!(
        subjects(subject_options(&[
            ("format", "avro-confluent"),
            ("key.format", "avro-confluent"),
            ("key.avro-confluent.subject", "sub2"),
            ("key.fields", "name"),
        ])),
        (Some("myTopic-value".to_string()), Some("sub2".to_string()))
    );
}

#[test]
fn test_source_does_not_complete_subjects() {
    let spec = source(
        test_schema(),
        subject_options(&[("format", "avro-confluent")]),
    )
    .unwrap();
    assert!(spec.value_format().options().get("subject").is_none());
}

// ── Primary key ──

#[test]
fn test_primary_key_requires_changelog_format() {
    let schema = test_schema().with_primary_key("pk", &["name"]);
    let expected = "The Kafka table 'default.default.t1' with 'test-format' format doesn't \
                    support defining PRIMARY KEY constraint on the table, because it can't \
                    guarantee the semantic of primary key.";

    let err = source(schema.clone(), source_options()).unwrap_err();
    assert!(matches!(err, ConnectorError::UnsupportedCombination { .. }));
    assert_eq!(err.to_string(), expected);

    let err = sink(schema.clone(), sink_options()).unwrap_err();
    assert_eq!(err.to_string(), expected);

    let cdc = [("test-format.changelog-mode", "I;UA;UB;D")];
    let spec = source(schema.clone(), with_options(source_options(), &cdc)).unwrap();
    assert_eq!(spec.value_format().changelog_mode(), &ChangelogMode::all());
    assert!(sink(schema, with_options(sink_options(), &cdc)).is_ok());
}

// ── Validation failures ──

#[test]
fn test_topic_and_pattern_conflict() {
    let options = with_options(source_options(), &[("topic-pattern", "myTopic-\\d+")]);
    let err = source(test_schema(), options).unwrap_err();
    assert!(matches!(err, ConnectorError::ConfigurationConflict { .. }));
    assert_eq!(
        err.to_string(),
        "Option 'topic' and 'topic-pattern' shouldn't be set together."
    );
}

#[test]
fn test_missing_topic() {
    let options = with_options(source_options(), &[("topic", "")]);
    let err = source(test_schema(), options).unwrap_err();
    assert!(matches!(err, ConnectorError::MissingRequiredOption { .. }));
    assert_eq!(err.to_string(), "Either 'topic' or 'topic-pattern' must be set.");
}

#[test]
fn test_missing_startup_timestamp() {
    let options = with_options(source_options(), &[("scan.startup.mode", "timestamp")]);
    let err = source(test_schema(), options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "'scan.startup.timestamp-millis' is required in 'timestamp' startup mode but missing."
    );
}

#[test]
fn test_missing_specific_offsets() {
    let options = with_options(source_options(), &[("scan.startup.specific-offsets", "")]);
    let err = source(test_schema(), options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "'scan.startup.specific-offsets' is required in 'specific-offsets' startup mode but missing."
    );
}

#[test]
fn test_invalid_specific_offsets() {
    let options = with_options(
        source_options(),
        &[("scan.startup.specific-offsets", "partition:0,offset:x")],
    );
    let err = source(test_schema(), options).unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidValue { .. }));
    assert_eq!(
        err.to_string(),
        "Invalid properties 'scan.startup.specific-offsets' should follow the format \
         'partition:0,offset:42;partition:1,offset:300', but is 'partition:0,offset:x'."
    );
}

#[test]
fn test_specific_offsets_require_single_topic() {
    let options = with_options(source_options(), &[("topic", "a;b")]);
    let err = source(test_schema(), options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Currently Kafka source only supports specific offset for single topic."
    );
}

#[test]
fn test_invalid_partitioner_class() {
    let options = with_options(sink_options(), &[("sink.partitioner", "abc")]);
    let err = sink(test_schema(), options).unwrap_err();
    assert!(matches!(err, ConnectorError::InstantiationFailure { .. }));
    assert!(err
        .to_string()
        .contains("Could not find and instantiate partitioner class 'abc'"));
}

#[test]
fn test_empty_partitioner() {
    let options = with_options(sink_options(), &[("sink.partitioner", " ")]);
    let err = sink(test_schema(), options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Option 'sink.partitioner' should be a non-empty string."
    );
}

#[test]
fn test_round_robin_with_key_fields() {
    let options = with_options(key_value_options(), &[("sink.partitioner", "round-robin")]);
    let err = sink(test_schema(), options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Currently 'round-robin' partitioner only works when option 'key.fields' is not specified."
    );

    let options = with_options(sink_options(), &[("sink.partitioner", "round-robin")]);
    let spec = sink(test_schema(), options).unwrap();
    assert_eq!(spec.partitioner().spec(), &PartitionerSpec::RoundRobin);
}

#[test]
fn test_sink_with_multiple_topics() {
    let options = with_options(sink_options(), &[("topic", "a;b;c")]);
    let err = sink(test_schema(), options).unwrap_err();
    assert!(matches!(err, ConnectorError::CardinalityViolation { .. }));
    assert_eq!(
        err.to_string(),
        "Flink Kafka sink currently only supports single topic, but got 'topic': [a, b, c]."
    );
}

#[test]
fn test_sink_with_topic_pattern() {
    let options = with_options(
        sink_options(),
        &[("topic", ""), ("topic-pattern", "myTopic-\\d+")],
    );
    let err = sink(test_schema(), options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Flink Kafka sink currently only supports single topic, but got 'topic-pattern': myTopic-\\d+."
    );
}

#[test]
fn test_exactly_once_without_prefix() {
    let options = with_options(sink_options(), &[("sink.transactional-id-prefix", "")]);
    let err = sink(test_schema(), options).unwrap_err();
    assert!(matches!(err, ConnectorError::MissingRequiredOption { .. }));
    assert_eq!(
        err.to_string(),
        "sink.transactional-id-prefix must be specified when using DeliveryGuarantee.EXACTLY_ONCE."
    );
}

#[test]
fn test_invalid_sink_parallelism() {
    let options = with_options(sink_options(), &[("sink.parallelism", "0")]);
    let err = sink(test_schema(), options).unwrap_err();
    assert_eq!(err.option_keys(), vec!["sink.parallelism"]);
}

#[test]
fn test_buffer_flush_requires_both_options() {
    let options = with_options(sink_options(), &[("sink.buffer-flush.interval", "1 s")]);
    let err = sink(test_schema(), options).unwrap_err();
    assert!(matches!(err, ConnectorError::ConfigurationConflict { .. }));
}

#[test]
fn test_buffer_flush_interval_out_of_range() {
    let options = with_options(
        sink_options(),
        &[
            ("sink.buffer-flush.max-rows", "100"),
            ("sink.buffer-flush.interval", "999999999999999999 d"),
        ],
    );
    let err = sink(test_schema(), options).unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidValue { .. }));
    assert_eq!(err.option_keys(), vec!["sink.buffer-flush.interval"]);
    assert!(err.to_string().contains("is out of range"));
}

#[test]
fn test_unsupported_options() {
    let options = with_options(
        source_options(),
        &[("foo", "bar"), ("test-format.bogus", "x")],
    );
    let err = source(test_schema(), options).unwrap_err();
    assert_eq!(err.option_keys(), vec!["foo", "test-format.bogus"]);
}

#[test]
fn test_properties_pass_through() {
    let options = with_options(source_options(), &[("properties.client.id", "c1")]);
    let spec = source(test_schema(), options).unwrap();
    assert_eq!(spec.properties().get("client.id"), Some(&"c1".to_string()));
}

#[test]
fn test_format_and_value_format_conflict() {
    let options = with_options(
        source_options(),
        &[("value.format", "test-format"), ("value.test-format.delimiter", "|")],
    );
    let err = source(test_schema(), options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Option 'format' and 'value.format' shouldn't be set together."
    );
}

#[test]
fn test_missing_value_format() {
    let options = with_options(
        source_options(),
        &[("format", ""), ("test-format.delimiter", ""), ("test-format.fail-on-missing", "")],
    );
    let err = source(test_schema(), options.clone()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not find required scan format 'value.format'."
    );

    let err = sink(test_schema(), options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not find required sink format 'value.format'."
    );
}

#[test]
fn test_missing_format_option() {
    let options = with_options(source_options(), &[("test-format.delimiter", "")]);
    let err = source(test_schema(), options).unwrap_err();
    assert!(matches!(err, ConnectorError::MissingRequiredOption { .. }));
    assert_eq!(err.option_keys(), vec!["test-format.delimiter"]);
}

#[test]
fn test_unknown_format() {
    let options = with_options(source_options(), &[("format", "protobuf")]);
    let err = source(test_schema(), options).unwrap_err();
    assert!(matches!(err, ConnectorError::UnknownFormat { .. }));
}

#[test]
fn test_wrong_connector() {
    let options = with_options(source_options(), &[("connector", "filesystem")]);
    let err = source(test_schema(), options).unwrap_err();
    assert_eq!(err.option_keys(), vec!["connector"]);
}

#[test]
fn test_missing_bootstrap_servers() {
    let options = with_options(source_options(), &[("properties.bootstrap.servers", "")]);
    let err = source(test_schema(), options).unwrap_err();
    assert!(matches!(err, ConnectorError::MissingRequiredOption { .. }));
    assert_eq!(err.option_keys(), vec!["properties.bootstrap.servers"]);
}

#[test]
fn test_unknown_metadata_key() {
    let schema = TableSchema::new(vec![
        Column::physical("name", DataType::Utf8),
        Column::metadata("m", DataType::Utf8, Some("value.metadata_3"), false),
    ]);
    let err = source(schema, source_options()).unwrap_err();
    assert!(matches!(err, ConnectorError::SchemaMismatch { .. }));
}
