use super::{
    item::{self, Item},
    DynamoTableClient,
};
use crate::{
    context::CallContext,
    entity::{WriteConversionError, PARTITION_KEY, ROW_KEY},
    errors::ListError,
    filter::Filter,
    traits::{EntityPager, ListOptions, Page},
};
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::DisplayErrorContext, operation::scan::ScanError, types::AttributeValue,
};
use itertools::Itertools;
use log::debug;
use std::collections::HashMap;

/// Scan over a DynamoDB table, one `Scan` request per page.
///
/// DynamoDB applies `Limit` before the filter, so a page can come back empty while
/// `LastEvaluatedKey` still points further into the table.
pub(crate) struct DynamoPager<'t> {
    client: &'t DynamoTableClient,
    options: ListOptions,
    exclusive_start_key: Option<Item>,
    done: bool,
    pages: usize,
}

impl<'t> DynamoPager<'t> {
    pub(crate) fn new(client: &'t DynamoTableClient, options: ListOptions) -> Self {
        Self {
            client,
            options,
            exclusive_start_key: None,
            done: false,
            pages: 0,
        }
    }
}

#[async_trait]
impl EntityPager for DynamoPager<'_> {
    fn more(&self) -> bool {
        !self.done
    }

    async fn next_page(&mut self, ctx: &CallContext) -> Result<Page, ListError> {
        if self.done {
            return Err(ListError::Exhausted);
        }

        let expression = ScanExpression::from_options(&self.options)?;

        let output = ctx
            .run(
                self.client
                    .db
                    .scan()
                    .table_name(&self.client.table_name)
                    .set_limit(self.options.top)
                    .set_exclusive_start_key(self.exclusive_start_key.clone())
                    .set_filter_expression(expression.filter)
                    .set_projection_expression(expression.projection)
                    .set_expression_attribute_names(non_empty(expression.names))
                    .set_expression_attribute_values(non_empty(expression.values))
                    .send(),
            )
            .await?
            .map_err(|e| match e.as_service_error() {
                Some(ScanError::ResourceNotFoundException(_)) => {
                    ListError::TableNotFound(self.client.table_name.clone())
                }
                _ => ListError::Aws(DisplayErrorContext(&e).to_string()),
            })?;

        self.pages += 1;
        self.exclusive_start_key = output.last_evaluated_key.filter(|key| !key.is_empty());
        self.done = self.exclusive_start_key.is_none();

        let entities = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|raw| -> Result<Vec<u8>, ListError> { Ok(item::from_item(raw)?.to_vec()?) })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "SCAN {} page {}: {} entities, more: {}",
            self.client.table_name,
            self.pages,
            entities.len(),
            !self.done
        );

        Ok(Page { entities })
    }
}

/// Filter and projection expressions with their placeholder maps.
#[derive(Debug, Default, PartialEq)]
struct ScanExpression {
    filter: Option<String>,
    projection: Option<String>,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl ScanExpression {
    fn from_options(options: &ListOptions) -> Result<Self, WriteConversionError> {
        let mut expression = Self::default();

        if let Some(filter) = &options.filter {
            expression.filter = Some(expression.compile_filter(filter)?);
        }

        if let Some(select) = &options.select {
            let mut attributes = vec![PARTITION_KEY.to_string(), ROW_KEY.to_string()];
            for name in select {
                attributes.push(name.clone());
                attributes.push(item::annotation_name(name));
            }

            let projection = attributes
                .into_iter()
                .unique()
                .map(|attribute| expression.name_placeholder("p", attribute))
                .join(", ");

            expression.projection = Some(projection);
        }

        Ok(expression)
    }

    fn compile_filter(&mut self, filter: &Filter) -> Result<String, WriteConversionError> {
        let mut clauses = Vec::with_capacity(filter.conditions().len());

        for (i, condition) in filter.conditions().iter().enumerate() {
            let name = self.name_placeholder("f", condition.field().to_string());
            let value = format!(":v{i}");
            self.values
                .insert(value.clone(), item::to_attribute_value(condition.value())?);
            clauses.push(format!("{name} = {value}"));
        }

        Ok(clauses.join(" AND "))
    }

    fn name_placeholder(&mut self, prefix: &str, attribute: String) -> String {
        let placeholder = format!("#{prefix}{}", self.names.len());
        self.names.insert(placeholder.clone(), attribute);
        placeholder
    }
}

fn non_empty<V>(map: HashMap<String, V>) -> Option<HashMap<String, V>> {
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_options() {
        let expression = ScanExpression::from_options(&ListOptions::new()).unwrap();
        assert_eq!(expression, ScanExpression::default());
    }

    #[test]
    fn test_partition_filter() {
        let options = ListOptions::new().filter(Filter::partition_key_eq("gear-surf-surfboards"));
        let expression = ScanExpression::from_options(&options).unwrap();

        assert_eq!(expression.filter.as_deref(), Some("#f0 = :v0"));
        assert_eq!(expression.names.get("#f0").map(String::as_str), Some("PartitionKey"));
        assert_eq!(
            expression.values.get(":v0"),
            Some(&AttributeValue::S("gear-surf-surfboards".into()))
        );
        assert!(expression.projection.is_none());
    }

    #[test]
    fn test_compound_filter_and_projection() {
        let options = ListOptions::new()
            .filter(Filter::partition_key_eq("gear-surf-surfboards").and_eq("Clearance", true))
            .select(["Name", "Price"]);

        let expression = ScanExpression::from_options(&options).unwrap();

        assert_eq!(expression.filter.as_deref(), Some("#f0 = :v0 AND #f1 = :v1"));
        assert_eq!(expression.values.get(":v1"), Some(&AttributeValue::Bool(true)));
        assert_eq!(
            expression.projection.as_deref(),
            Some("#p2, #p3, #p4, #p5, #p6, #p7")
        );
        assert_eq!(expression.names.get("#p4").map(String::as_str), Some("Name"));
        assert_eq!(
            expression.names.get("#p7").map(String::as_str),
            Some("Price@odata.type")
        );
    }

    #[test]
    fn test_non_finite_filter_value() {
        let options = ListOptions::new().filter(Filter::eq("Price", f64::NAN));
        assert!(ScanExpression::from_options(&options).is_err());
    }

    #[test]
    fn test_non_empty() {
        assert!(non_empty::<String>(HashMap::new()).is_none());
        assert!(non_empty(HashMap::from([("#a".to_string(), 1)])).is_some());
    }
}
