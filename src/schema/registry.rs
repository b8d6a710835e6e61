//! Registry of the SEC MAR table schemas
//!
//! Built once at startup. A schema that fails to build stops the process
//! before any batch is read.

use super::checks::Check;
use super::errors::SchemaResult;
use super::types::{FieldSpec, FieldType, TableKind, TableSchema};

/// Marker for "unknown / not applicable" on bounded numeric fields
pub const UNKNOWN_SENTINEL: f64 = -1.0;

/// Accepted values of `type_operation`
pub const OPERATION_TYPES: [&str; 4] = ["SAR", "MAS", "DIV", "SUR"];

/// Read-only set of table schemas, safe to share between ingestion runs.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    operations: TableSchema,
    flotteurs: TableSchema,
    resultats_humain: TableSchema,
}

impl SchemaRegistry {
    /// Builds the standard SEC MAR schemas.
    ///
    /// # Errors
    ///
    /// Any malformed definition is returned as a fatal `SchemaError`.
    pub fn standard() -> SchemaResult<Self> {
        Ok(Self {
            operations: operations_schema()?,
            flotteurs: flotteurs_schema()?,
            resultats_humain: resultats_humain_schema()?,
        })
    }

    /// Returns the schema for a table kind
    pub fn get(&self, kind: TableKind) -> &TableSchema {
        match kind {
            TableKind::Operations => &self.operations,
            TableKind::Flotteurs => &self.flotteurs,
            TableKind::ResultatsHumain => &self.resultats_humain,
        }
    }

    /// Returns the schema registered under a table name
    pub fn by_name(&self, table: &str) -> SchemaResult<&TableSchema> {
        Ok(self.get(table.parse()?))
    }

    /// Iterates over all schemas, parents first
    pub fn all(&self) -> impl Iterator<Item = &TableSchema> {
        TableKind::ALL.into_iter().map(move |kind| self.get(kind))
    }
}

fn operations_schema() -> SchemaResult<TableSchema> {
    use FieldType::{Boolean, Float, Integer, Text, Timestamp};

    TableSchema::builder(TableKind::Operations)
        .field(FieldSpec::new("operation_id", Integer).unique())
        .field(FieldSpec::optional("date_heure_reception_alerte", Timestamp))
        .field(FieldSpec::optional("date_heure_fin_operation", Timestamp))
        .field(FieldSpec::nullable("type_operation", Text).check(Check::one_of(&OPERATION_TYPES)))
        .field(FieldSpec::nullable("type_operation_saisi", Boolean))
        .field(FieldSpec::nullable("evenement", Text))
        .field(FieldSpec::nullable("categorie_evenement", Text))
        .field(FieldSpec::nullable("zone_responsabilite", Text))
        .field(FieldSpec::nullable("fuseau_horaire", Text))
        .field(FieldSpec::nullable("pourquoi_alerte", Text))
        .field(FieldSpec::nullable("pourquoi_alerte_saisi", Boolean))
        .field(FieldSpec::nullable("moyen_alerte", Text))
        .field(FieldSpec::nullable("qui_alerte", Text))
        .field(FieldSpec::nullable("categorie_qui_alerte", Text))
        .field(FieldSpec::nullable("cross_name", Text))
        .field(FieldSpec::nullable("departement", Text).check(Check::NonBlank))
        .field(FieldSpec::nullable("prefecture_maritime", Text))
        .field(FieldSpec::nullable("est_metropolitain", Boolean))
        // Beaufort scale
        .field(
            FieldSpec::optional("vent_force", Float)
                .check(Check::in_range_or(0.0, 12.0, UNKNOWN_SENTINEL)),
        )
        // Douglas scale
        .field(
            FieldSpec::optional("mer_force", Float)
                .check(Check::in_range_or(0.0, 9.0, UNKNOWN_SENTINEL)),
        )
        .field(
            FieldSpec::optional("vent_direction", Float)
                .check(Check::in_range_or(0.0, 360.0, UNKNOWN_SENTINEL)),
        )
        .field(
            FieldSpec::nullable("longitude", Float)
                .check(Check::in_range_or(-180.0, 180.0, UNKNOWN_SENTINEL)),
        )
        .field(
            FieldSpec::nullable("latitude", Float)
                .check(Check::in_range_or(-90.0, 90.0, UNKNOWN_SENTINEL)),
        )
        .field(FieldSpec::nullable("autorite", Text))
        .field(FieldSpec::optional("numero_sitrep", Integer))
        .field(FieldSpec::nullable("cross_sitrep", Text))
        .field(FieldSpec::nullable("systeme_source", Text))
        .field(FieldSpec::nullable("sans_flotteur_implique", Boolean))
        .field(FieldSpec::nullable("total_flotteurs_impliques", Integer).check(Check::at_least(0.0)))
        .field(FieldSpec::nullable("maree_categorie", Text))
        .field(FieldSpec::nullable("maree_port", Text))
        .field(FieldSpec::nullable("maree_coefficient", Integer))
        .field(FieldSpec::nullable("distance_cote_metres", Integer).check(Check::at_least(0.0)))
        .field(
            FieldSpec::nullable("distance_cote_milles_nautiques", Integer)
                .check(Check::at_least(0.0)),
        )
        .field(FieldSpec::nullable("est_vacances_scolaires", Boolean))
        .field(FieldSpec::nullable("donnees_meteo_imputees", Boolean))
        .build()
}

fn flotteurs_schema() -> SchemaResult<TableSchema> {
    use FieldType::{Integer, Text};

    TableSchema::builder(TableKind::Flotteurs)
        .strict()
        .field(FieldSpec::new("operation_id", Integer))
        .field(FieldSpec::new("numero_ordre", Integer).check(Check::at_least(0.0)))
        .field(FieldSpec::new("pavillon", Text))
        .field(FieldSpec::new("resultat_flotteur", Text))
        .field(FieldSpec::new("type_flotteur", Text))
        .field(FieldSpec::new("categorie_flotteur", Text))
        .field(FieldSpec::nullable("numero_immatriculation", Text))
        .unique_together(&["operation_id", "numero_ordre"])
        .build()
}

fn resultats_humain_schema() -> SchemaResult<TableSchema> {
    use FieldType::{Integer, Text};

    TableSchema::builder(TableKind::ResultatsHumain)
        .strict()
        .field(FieldSpec::new("operation_id", Integer))
        .field(FieldSpec::new("categorie_personne", Text))
        .field(FieldSpec::new("resultat_humain", Text))
        .field(FieldSpec::new("nombre", Integer).check(Check::at_least(0.0)))
        .field(FieldSpec::new("dont_nombre_blesse", Integer).check(Check::at_least(0.0)))
        .build()
}
