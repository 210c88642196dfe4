//! Postgres-backed ontology store (spec.md §6.2 logical layout,
//! `ontology.regulation`/`ontology.document`/`ontology.attribute`/
//! `ontology.attribute_doc_link`/`ontology.doc_reg_link`/
//! `ontology.attribute_derivation`).
//!
//! Queries are runtime-checked (`sqlx::query`/`query_as` with manual row
//! structs), not the `query!`/`query_as!` compile-time macros, since there
//! is no live database to check them against at build time — the same
//! tradeoff `examples/other_examples/d441005a_..._graph_validate_ops.rs.rs`
//! makes behind its `#[cfg(feature = "database")]` gate.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::error::OntologyError;
use crate::model::{
    canonical_code, Attribute, AttributeClass, AttributeDerivationRecord, Document, Regulation,
};
use crate::store::OntologyStore;

pub struct PostgresOntologyStore {
    pool: PgPool,
}

impl PostgresOntologyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_attribute(row: &sqlx::postgres::PgRow) -> Result<Attribute, OntologyError> {
    let class_raw: String = row.try_get("class").map_err(transient)?;
    let class = match class_raw.as_str() {
        "public" => AttributeClass::Public,
        "private" => AttributeClass::Private,
        other => {
            return Err(OntologyError::Transient(format!(
                "unrecognized attribute class {:?} in ontology.attribute row",
                other
            )))
        }
    };
    Ok(Attribute {
        code: row.try_get("code").map_err(transient)?,
        name: row.try_get("name").map_err(transient)?,
        domain: row.try_get("domain").map_err(transient)?,
        data_type: row.try_get("data_type").map_err(transient)?,
        class,
        enumeration: row.try_get("enumeration").map_err(transient)?,
    })
}

fn transient(e: sqlx::Error) -> OntologyError {
    OntologyError::Transient(e.to_string())
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<Document, OntologyError> {
    Ok(Document {
        code: row.try_get("code").map_err(transient)?,
        name: row.try_get("name").map_err(transient)?,
        doc_type: row.try_get("doc_type").map_err(transient)?,
        jurisdiction: row.try_get("jurisdiction").map_err(transient)?,
        valid_from: row.try_get("valid_from").map_err(transient)?,
        valid_to: row.try_get("valid_to").map_err(transient)?,
    })
}

fn row_to_regulation(row: &sqlx::postgres::PgRow) -> Result<Regulation, OntologyError> {
    Ok(Regulation {
        code: row.try_get("code").map_err(transient)?,
        name: row.try_get("name").map_err(transient)?,
        jurisdictions: row.try_get("jurisdictions").map_err(transient)?,
    })
}

#[async_trait]
impl OntologyStore for PostgresOntologyStore {
    #[instrument(skip(self))]
    async fn all_document_codes(&self) -> Result<Vec<String>, OntologyError> {
        sqlx::query("SELECT code FROM ontology.document")
            .fetch_all(&self.pool)
            .await
            .map_err(transient)?
            .iter()
            .map(|row| row.try_get("code").map_err(transient))
            .collect()
    }

    #[instrument(skip(self))]
    async fn all_attribute_codes(&self) -> Result<Vec<String>, OntologyError> {
        sqlx::query("SELECT code FROM ontology.attribute")
            .fetch_all(&self.pool)
            .await
            .map_err(transient)?
            .iter()
            .map(|row| row.try_get("code").map_err(transient))
            .collect()
    }

    #[instrument(skip(self))]
    async fn all_regulation_codes(&self) -> Result<Vec<String>, OntologyError> {
        sqlx::query("SELECT code FROM ontology.regulation")
            .fetch_all(&self.pool)
            .await
            .map_err(transient)?
            .iter()
            .map(|row| row.try_get("code").map_err(transient))
            .collect()
    }

    #[instrument(skip(self))]
    async fn get_attribute(&self, code: &str) -> Result<Attribute, OntologyError> {
        let row = sqlx::query("SELECT code, name, domain, data_type, class, enumeration FROM ontology.attribute WHERE code = $1")
            .bind(canonical_code(code))
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)?
            .ok_or_else(|| OntologyError::NotFound {
                kind: "attribute",
                code: code.to_string(),
            })?;
        row_to_attribute(&row)
    }

    #[instrument(skip(self))]
    async fn get_document(&self, code: &str) -> Result<Document, OntologyError> {
        let row = sqlx::query(
            "SELECT code, name, doc_type, jurisdiction, valid_from, valid_to FROM ontology.document WHERE code = $1",
        )
        .bind(canonical_code(code))
        .fetch_optional(&self.pool)
        .await
        .map_err(transient)?
        .ok_or_else(|| OntologyError::NotFound {
            kind: "document",
            code: code.to_string(),
        })?;
        row_to_document(&row)
    }

    #[instrument(skip(self))]
    async fn get_regulation(&self, code: &str) -> Result<Regulation, OntologyError> {
        let row = sqlx::query("SELECT code, name, jurisdictions FROM ontology.regulation WHERE code = $1")
            .bind(canonical_code(code))
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)?
            .ok_or_else(|| OntologyError::NotFound {
                kind: "regulation",
                code: code.to_string(),
            })?;
        row_to_regulation(&row)
    }

    #[instrument(skip(self))]
    async fn document_exists(&self, code: &str) -> Result<bool, OntologyError> {
        let row = sqlx::query("SELECT 1 FROM ontology.document WHERE code = $1")
            .bind(canonical_code(code))
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)?;
        Ok(row.is_some())
    }

    #[instrument(skip(self))]
    async fn regulation_exists(&self, code: &str) -> Result<bool, OntologyError> {
        let row = sqlx::query("SELECT 1 FROM ontology.regulation WHERE code = $1")
            .bind(canonical_code(code))
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)?;
        Ok(row.is_some())
    }

    #[instrument(skip(self))]
    async fn document_linked_to_regulation(&self, code: &str) -> Result<bool, OntologyError> {
        let row = sqlx::query("SELECT 1 FROM ontology.doc_reg_link WHERE document = $1")
            .bind(canonical_code(code))
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)?;
        Ok(row.is_some())
    }

    #[instrument(skip(self))]
    async fn get_attribute_derivations(
        &self,
        derived_code: &str,
    ) -> Result<Vec<AttributeDerivationRecord>, OntologyError> {
        let rows = sqlx::query(
            "SELECT derived, source, rule, jurisdiction, regulation \
             FROM ontology.attribute_derivation WHERE derived = $1",
        )
        .bind(canonical_code(derived_code))
        .fetch_all(&self.pool)
        .await
        .map_err(transient)?;
        rows.iter()
            .map(|row| {
                Ok(AttributeDerivationRecord {
                    derived: row.try_get("derived").map_err(transient)?,
                    source: row.try_get("source").map_err(transient)?,
                    rule: row.try_get("rule").map_err(transient)?,
                    jurisdiction: row.try_get("jurisdiction").map_err(transient)?,
                    regulation: row.try_get("regulation").map_err(transient)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn list_public_attributes(&self) -> Result<Vec<Attribute>, OntologyError> {
        let rows = sqlx::query(
            "SELECT code, name, domain, data_type, class, enumeration FROM ontology.attribute WHERE class = 'public'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(transient)?;
        rows.iter().map(row_to_attribute).collect()
    }

    #[instrument(skip(self))]
    async fn list_private_attributes(&self) -> Result<Vec<Attribute>, OntologyError> {
        let rows = sqlx::query(
            "SELECT code, name, domain, data_type, class, enumeration FROM ontology.attribute WHERE class = 'private'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(transient)?;
        rows.iter().map(row_to_attribute).collect()
    }

    #[instrument(skip(self))]
    async fn list_documents(&self) -> Result<Vec<Document>, OntologyError> {
        let rows = sqlx::query("SELECT code, name, doc_type, jurisdiction, valid_from, valid_to FROM ontology.document")
            .fetch_all(&self.pool)
            .await
            .map_err(transient)?;
        rows.iter().map(row_to_document).collect()
    }

    #[instrument(skip(self))]
    async fn list_regulations(&self) -> Result<Vec<Regulation>, OntologyError> {
        let rows = sqlx::query("SELECT code, name, jurisdictions FROM ontology.regulation")
            .fetch_all(&self.pool)
            .await
            .map_err(transient)?;
        rows.iter().map(row_to_regulation).collect()
    }

    #[instrument(skip(self))]
    async fn documents_by_regulation(&self, regulation_code: &str) -> Result<Vec<Document>, OntologyError> {
        let rows = sqlx::query(
            "SELECT d.code, d.name, d.doc_type, d.jurisdiction, d.valid_from, d.valid_to \
             FROM ontology.document d \
             JOIN ontology.doc_reg_link l ON l.document = d.code \
             WHERE l.regulation = $1",
        )
        .bind(canonical_code(regulation_code))
        .fetch_all(&self.pool)
        .await
        .map_err(transient)?;
        rows.iter().map(row_to_document).collect()
    }
}
