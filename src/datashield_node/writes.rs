use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::db_operations::merge_document;
use crate::error::{ShieldError, ShieldResult};
use crate::permissions::row_policy::{check_row_access_async, AsyncRowPolicy};
use crate::permissions::types::{RowOperation, WriteValidation};
use crate::permissions::PolicyApplier;
use crate::schema::SchemaNode;
use crate::sensitive::wrap_document;

use super::audit::DenialEvent;
use super::DataShieldNode;

impl DataShieldNode {
    /// Inserts a document, returning its generated id.
    ///
    /// Row and field checks complete strictly before the storage call; a
    /// denial aborts before any mutation is attempted. Sensitive fields are
    /// wrapped into their at-rest form on the way down.
    pub async fn insert(
        &self,
        ctx: &Value,
        table: &str,
        doc: &Value,
        rules: Option<&AsyncRowPolicy>,
    ) -> ShieldResult<String> {
        let decision = check_row_access_async(ctx, doc, rules, RowOperation::Insert, None).await;
        if !decision.allowed {
            let reason = decision.reason.as_deref().unwrap_or("rls_insert_denied");
            warn!("INSERT: table={} denied by row policy", table);
            self.emit_denial(DenialEvent::new(table, "insert", None, reason));
            return Err(ShieldError::Permission(format!(
                "Insert denied for table {}: {}",
                table, reason
            )));
        }

        let schema = self.schema_core.table_schema(table)?;
        let stored = match &schema {
            Some(schema) => {
                self.enforce_write_policy(ctx, table, None, doc, schema).await?;
                wrap_document(doc, schema, self.schema_core.as_ref())?
            }
            None => doc.clone(),
        };

        let id = Uuid::new_v4().to_string();
        self.backend.insert(table, &id, &stored).await?;
        info!("INSERT: table={} id={}", table, id);
        Ok(id)
    }

    /// Merges fields into an existing document.
    ///
    /// The update rule sees both the previous document and the merged
    /// candidate, so authorization can depend on the delta. A missing
    /// document is an error.
    pub async fn patch(
        &self,
        ctx: &Value,
        table: &str,
        id: &str,
        fields: &Value,
        rules: Option<&AsyncRowPolicy>,
    ) -> ShieldResult<()> {
        let Some(stored_previous) = self.backend.get(table, id).await? else {
            return Err(ShieldError::NotFound(format!(
                "Document {} not found in table {}",
                id, table
            )));
        };
        let schema = self.schema_core.table_schema(table)?;
        let previous = self.restore(&stored_previous, schema.as_ref())?;
        let candidate = merge_document(&previous, fields).map_err(ShieldError::from)?;

        let decision =
            check_row_access_async(ctx, &candidate, rules, RowOperation::Update, Some(&previous))
                .await;
        if !decision.allowed {
            let reason = decision.reason.as_deref().unwrap_or("rls_update_denied");
            warn!("UPDATE: table={} id={} denied by row policy", table, id);
            self.emit_denial(DenialEvent::new(table, "update", Some(id), reason));
            return Err(ShieldError::Permission(format!(
                "Update denied for table {}: {}",
                table, reason
            )));
        }

        let stored_fields = match &schema {
            Some(schema) => {
                self.enforce_write_policy(ctx, table, Some(id), fields, schema).await?;
                wrap_document(fields, schema, self.schema_core.as_ref())?
            }
            None => fields.clone(),
        };

        self.backend.patch(table, id, &stored_fields).await?;
        info!("UPDATE: table={} id={}", table, id);
        Ok(())
    }

    /// Deletes a document. Deleting a missing document succeeds.
    pub async fn delete(
        &self,
        ctx: &Value,
        table: &str,
        id: &str,
        rules: Option<&AsyncRowPolicy>,
    ) -> ShieldResult<()> {
        let Some(stored) = self.backend.get(table, id).await? else {
            info!("DELETE: table={} id={} already absent", table, id);
            return Ok(());
        };
        let schema = self.schema_core.table_schema(table)?;
        let doc = self.restore(&stored, schema.as_ref())?;

        let decision = check_row_access_async(ctx, &doc, rules, RowOperation::Delete, None).await;
        if !decision.allowed {
            let reason = decision.reason.as_deref().unwrap_or("rls_delete_denied");
            warn!("DELETE: table={} id={} denied by row policy", table, id);
            self.emit_denial(DenialEvent::new(table, "delete", Some(id), reason));
            return Err(ShieldError::Permission(format!(
                "Delete denied for table {}: {}",
                table, reason
            )));
        }

        self.backend.delete(table, id).await?;
        info!("DELETE: table={} id={}", table, id);
        Ok(())
    }

    /// Validates write policies over the incoming fields and raises one
    /// error naming every denied path.
    async fn enforce_write_policy(
        &self,
        ctx: &Value,
        table: &str,
        doc_id: Option<&str>,
        fields: &Value,
        schema: &Arc<SchemaNode>,
    ) -> ShieldResult<()> {
        let applier =
            PolicyApplier::new(self.schema_core.as_ref()).with_resolver(self.policy_resolver());
        let validation = applier
            .validate_write_policy_async(fields, schema, ctx, self.entitlements.as_ref())
            .await?;
        if validation.allowed {
            return Ok(());
        }

        for field in &validation.denied_fields {
            self.emit_denial(
                DenialEvent::new(table, "write_policy", doc_id, &field.reason)
                    .with_path(&field.path),
            );
        }
        Err(write_denied_error(table, &validation))
    }
}

fn write_denied_error(table: &str, validation: &WriteValidation) -> ShieldError {
    let details: Vec<String> = validation
        .denied_fields
        .iter()
        .map(|field| format!("{} ({})", field.path, field.reason))
        .collect();
    ShieldError::Permission(format!(
        "Write denied for table {}: {}",
        table,
        details.join(", ")
    ))
}
