use super::*;
use crate::error::OrmError;

fn products() -> OrmResult<TableSchema> {
    SchemaBuilder::new("products")
        .field(FieldDef::text("code").size(50).unique())
        .field(FieldDef::text("name"))
        .field(FieldDef::integer("price"))
        .field(FieldDef::boolean("in_stock").nullable(true).default_literal("true"))
        .build()
}

#[test]
fn describe_is_deterministic() {
    assert_eq!(products().unwrap(), products().unwrap());
}

#[test]
fn surrogate_key_is_synthesized_first() {
    let schema = products().unwrap();
    let names = schema.column_names();
    assert_eq!(names, vec!["id", "code", "name", "price", "in_stock"]);

    let id = schema.field("id").unwrap();
    assert!(id.primary_key);
    assert!(id.auto_increment);
    assert!(!id.nullable);
    assert_eq!(schema.auto_key().map(|f| f.name.as_str()), Some("id"));
    assert_eq!(schema.sequence_name().as_deref(), Some("products_id_seq"));
}

#[test]
fn unique_field_gets_conventional_index() {
    let schema = products().unwrap();
    assert_eq!(schema.indexes.len(), 1);
    let idx = schema.index("idx_products_code").unwrap();
    assert!(idx.unique);
    assert_eq!(idx.columns, vec!["code"]);
    assert!(schema.field("code").unwrap().unique);
}

#[test]
fn declared_id_field_is_promoted_to_key() {
    let schema = SchemaBuilder::new("items")
        .field(FieldDef::integer("id").nullable(true))
        .field(FieldDef::text("name"))
        .build()
        .unwrap();
    assert_eq!(schema.fields.len(), 2);
    assert_eq!(schema.primary_key().len(), 1);
    assert!(schema.field("id").unwrap().auto_increment);
}

#[test]
fn text_key_is_not_auto_assigned() {
    let schema = SchemaBuilder::new("codes")
        .field(FieldDef::text("code").primary_key())
        .build()
        .unwrap();
    assert!(schema.auto_key().is_none());
    assert_eq!(schema.sequence_name(), None);
}

#[test]
fn storage_types_follow_field_types() {
    let schema = SchemaBuilder::new("t")
        .field(FieldDef::integer("a"))
        .field(FieldDef::float("b"))
        .field(FieldDef::decimal("c").precision(10).scale(2))
        .field(FieldDef::decimal("d"))
        .field(FieldDef::text("e").size(20))
        .field(FieldDef::text("f"))
        .field(FieldDef::boolean("g"))
        .field(FieldDef::timestamp("h"))
        .build()
        .unwrap();
    let types: Vec<String> = schema.fields[1..].iter().map(|f| f.storage_type()).collect();
    assert_eq!(
        types,
        vec![
            "BIGINT",
            "DOUBLE",
            "DECIMAL(10,2)",
            "DECIMAL(18,3)",
            "VARCHAR(20)",
            "VARCHAR",
            "BOOLEAN",
            "TIMESTAMP"
        ]
    );
}

#[test]
fn composite_key_has_no_auto_key() {
    let schema = SchemaBuilder::new("order_items")
        .field(FieldDef::integer("order_id"))
        .field(FieldDef::integer("line"))
        .field(FieldDef::integer("qty"))
        .composite_key(["order_id", "line"])
        .build()
        .unwrap();
    assert_eq!(schema.primary_key().len(), 2);
    assert!(schema.auto_key().is_none());
    assert!(!schema.has_column("id"));
}

#[test]
fn multiple_primary_keys_are_rejected() {
    let err = SchemaBuilder::new("t")
        .field(FieldDef::integer("a").primary_key())
        .field(FieldDef::integer("b").primary_key())
        .build()
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidSchema(_)));
}

#[test]
fn nullable_manual_key_is_rejected() {
    let err = SchemaBuilder::new("t")
        .field(FieldDef::text("code").primary_key().nullable(true))
        .build()
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidSchema(_)));
}

#[test]
fn duplicate_fields_are_rejected() {
    let err = SchemaBuilder::new("t")
        .field(FieldDef::text("a"))
        .field(FieldDef::integer("a"))
        .build()
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidSchema(_)));
}

#[test]
fn options_must_match_field_type() {
    let err = SchemaBuilder::new("t")
        .field(FieldDef::integer("n").size(10))
        .build()
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidSchema(_)));

    let err = SchemaBuilder::new("t")
        .field(FieldDef::text("s").auto_now())
        .build()
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidSchema(_)));
}

#[test]
fn bad_default_literal_is_rejected() {
    let err = SchemaBuilder::new("t")
        .field(FieldDef::integer("n").default_literal("lots"))
        .build()
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidSchema(_)));
}

#[test]
fn timestamp_default_accepts_current_timestamp() {
    let schema = SchemaBuilder::new("t")
        .field(FieldDef::timestamp("created").default_literal("CURRENT_TIMESTAMP"))
        .build()
        .unwrap();
    let created = schema.field("created").unwrap();
    assert_eq!(created.default, Some(ColumnDefault::CurrentTimestamp));
    assert!(created.has_default());
}

#[test]
fn unknown_type_name_is_unsupported() {
    let err = FieldDef::named_type("data", "blob").unwrap_err();
    assert!(matches!(
        err,
        OrmError::UnsupportedFieldType { ref field, ref type_name }
            if field == "data" && type_name == "blob"
    ));
    assert!(FieldDef::named_type("n", "BIGINT").is_ok());
}

#[test]
fn storage_types_map_back() {
    assert_eq!(
        FieldType::from_storage_type("a", "DECIMAL(10,2)").unwrap(),
        FieldType::Decimal
    );
    assert_eq!(
        FieldType::from_storage_type("a", "TIMESTAMP WITH TIME ZONE").unwrap(),
        FieldType::Timestamp
    );
    assert!(FieldType::from_storage_type("a", "BLOB").is_err());
}

#[test]
fn invalid_table_name_is_rejected() {
    assert!(SchemaBuilder::new("bad name").build().is_err());
}
