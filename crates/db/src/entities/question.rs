//! Question entity - an ordered entry within a form.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of answer a question collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionType {
    #[sea_orm(string_value = "TEXT")]
    Text,
    #[sea_orm(string_value = "TEXTAREA")]
    Textarea,
    #[sea_orm(string_value = "NUMBER")]
    Number,
    #[sea_orm(string_value = "EMAIL")]
    Email,
    #[sea_orm(string_value = "RADIO")]
    Radio,
    #[sea_orm(string_value = "CHECKBOX")]
    Checkbox,
    #[sea_orm(string_value = "SELECT")]
    Select,
    #[sea_orm(string_value = "DATE")]
    Date,
}

impl QuestionType {
    /// Whether answers are picked from `options.choices`.
    #[must_use]
    pub const fn requires_choices(self) -> bool {
        matches!(self, Self::Radio | Self::Checkbox | Self::Select)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "question")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Parent form. Fixed at creation.
    pub form_id: String,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    #[sea_orm(column_name = "type")]
    pub question_type: QuestionType,

    /// Zero-based position. Not unique; gaps are allowed.
    pub order: i32,

    pub required: bool,

    /// `{"choices": [..], ...}`
    #[sea_orm(nullable)]
    pub options: Option<Json>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::form::Entity",
        from = "Column::FormId",
        to = "super::form::Column::Id",
        on_delete = "Cascade"
    )]
    Form,
}

impl Related<super::form::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Form.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
