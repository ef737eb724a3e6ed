use log::warn;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ShieldResult;
use crate::permissions::row_policy::{check_row_access_async, AsyncRowPolicy};
use crate::permissions::types::RowOperation;
use crate::permissions::{ApplyOptions, PolicyApplier};
use crate::schema::SchemaNode;
use crate::sensitive::unwrap_document;

use super::audit::DenialEvent;
use super::DataShieldNode;

impl DataShieldNode {
    /// Fetches one document, returning it reduced to the caller's access
    /// level.
    ///
    /// A row-level denial yields None, indistinguishable from a missing
    /// document; reads never raise on denial.
    pub async fn get(
        &self,
        ctx: &Value,
        table: &str,
        id: &str,
        rules: Option<&AsyncRowPolicy>,
    ) -> ShieldResult<Option<Value>> {
        let Some(stored) = self.backend.get(table, id).await? else {
            return Ok(None);
        };
        let schema = self.schema_core.table_schema(table)?;
        let doc = self.restore(&stored, schema.as_ref())?;

        let decision = check_row_access_async(ctx, &doc, rules, RowOperation::Read, None).await;
        if !decision.allowed {
            let reason = decision.reason.as_deref().unwrap_or("rls_read_denied");
            warn!("READ: table={} id={} denied by row policy", table, id);
            self.emit_denial(DenialEvent::new(table, "read", Some(id), reason));
            return Ok(None);
        }

        match &schema {
            Some(schema) => Ok(Some(self.redact(&doc, schema, ctx).await?)),
            None => Ok(Some(doc)),
        }
    }

    /// Fetches a whole table, row-filtered and field-redacted.
    ///
    /// Surviving documents keep their original relative order.
    pub async fn query(
        &self,
        ctx: &Value,
        table: &str,
        rules: Option<&AsyncRowPolicy>,
    ) -> ShieldResult<Vec<Value>> {
        let entries = self.backend.collect(table).await?;
        let schema = self.schema_core.table_schema(table)?;

        let mut results = Vec::with_capacity(entries.len());
        for (id, stored) in entries {
            let doc = self.restore(&stored, schema.as_ref())?;

            let decision = check_row_access_async(ctx, &doc, rules, RowOperation::Read, None).await;
            if !decision.allowed {
                let reason = decision.reason.as_deref().unwrap_or("rls_read_denied");
                self.emit_denial(DenialEvent::new(table, "read", Some(&id), reason));
                continue;
            }

            match &schema {
                Some(schema) => results.push(self.redact(&doc, schema, ctx).await?),
                None => results.push(doc),
            }
        }
        Ok(results)
    }

    /// Unwraps at-rest sensitive wrappers when the table has a schema.
    pub(crate) fn restore(
        &self,
        stored: &Value,
        schema: Option<&Arc<SchemaNode>>,
    ) -> ShieldResult<Value> {
        match schema {
            Some(schema) => unwrap_document(stored, schema, self.schema_core.as_ref()),
            None => Ok(stored.clone()),
        }
    }

    async fn redact(
        &self,
        doc: &Value,
        schema: &Arc<SchemaNode>,
        ctx: &Value,
    ) -> ShieldResult<Value> {
        let applier =
            PolicyApplier::new(self.schema_core.as_ref()).with_resolver(self.policy_resolver());
        applier
            .apply_read_policy_async(
                doc,
                schema,
                ctx,
                self.entitlements.as_ref(),
                &ApplyOptions::default(),
            )
            .await
    }
}
