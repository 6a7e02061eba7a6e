//! Procedure form record and its Salesforce webhook payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Explicit `null` on the wire reads as the field's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeEvents {
    #[serde(deserialize_with = "null_as_default")]
    pub groin_access: String,
    #[serde(deserialize_with = "null_as_default")]
    pub transseptal_puncture: String,
    #[serde(deserialize_with = "null_as_default")]
    pub farawave_insertion: String,
    #[serde(deserialize_with = "null_as_default")]
    pub farawave_removal: String,
    #[serde(deserialize_with = "null_as_default")]
    pub faradrive_removal: String,
    #[serde(deserialize_with = "null_as_default")]
    pub groin_closure: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Equipment {
    #[serde(deserialize_with = "null_as_default")]
    pub sheath1: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sheath2: String,
    #[serde(deserialize_with = "null_as_default")]
    pub mapping_catheter: String,
    #[serde(deserialize_with = "null_as_default")]
    pub transseptal_tool: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ice_catheter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Catheters {
    #[serde(deserialize_with = "null_as_default")]
    pub rx_catheter: String,
}

/// A submitted procedure record. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcedureRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub account_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ep_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub procedure_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub mapping_system: String,
    /// Lesion set name to selected flag, in submission order
    #[serde(deserialize_with = "null_as_default")]
    pub lesion_sets: Map<String, Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub time_events: TimeEvents,
    /// Minutes, as a number or numeric string
    pub fluoro_time: Value,
    pub applications: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub equipment: Equipment,
    #[serde(deserialize_with = "null_as_default")]
    pub catheters: Catheters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesforceTimeEvents {
    pub groin_access: String,
    pub transseptal_puncture: String,
    pub farawave_insertion: String,
    pub farawave_removal: String,
    pub faradrive_removal: String,
    pub groin_closure: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesforceEquipment {
    pub sheath_1: String,
    pub sheath_2: String,
    pub mapping_catheter: String,
    pub transseptal_tool: String,
    pub ice_catheter: String,
    pub rx_catheter: String,
}

/// Flat body expected by the Power Automate flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesforcePayload {
    pub account_name: String,
    pub ep_name: String,
    pub procedure_type: String,
    pub mapping_system: String,
    pub lesion_sets: String,
    pub time_events: SalesforceTimeEvents,
    pub fluoro_time: Value,
    pub applications: Value,
    pub equipment: SalesforceEquipment,
}

/// Empty, null, false and zero
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Blank values all become `0`
fn or_zero(value: &Value) -> Value {
    if is_blank(value) {
        Value::from(0)
    } else {
        value.clone()
    }
}

impl ProcedureRecord {
    pub fn to_salesforce_payload(&self) -> SalesforcePayload {
        let lesion_sets = self
            .lesion_sets
            .iter()
            .filter(|(_, selected)| !is_blank(selected))
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let events = &self.time_events;
        let equipment = &self.equipment;

        SalesforcePayload {
            account_name: self.account_name.clone(),
            ep_name: self.ep_name.clone(),
            procedure_type: self.procedure_type.clone(),
            mapping_system: self.mapping_system.clone(),
            lesion_sets,
            time_events: SalesforceTimeEvents {
                groin_access: events.groin_access.clone(),
                transseptal_puncture: events.transseptal_puncture.clone(),
                farawave_insertion: events.farawave_insertion.clone(),
                farawave_removal: events.farawave_removal.clone(),
                faradrive_removal: events.faradrive_removal.clone(),
                groin_closure: events.groin_closure.clone(),
            },
            fluoro_time: or_zero(&self.fluoro_time),
            applications: or_zero(&self.applications),
            equipment: SalesforceEquipment {
                sheath_1: equipment.sheath1.clone(),
                sheath_2: equipment.sheath2.clone(),
                mapping_catheter: equipment.mapping_catheter.clone(),
                transseptal_tool: equipment.transseptal_tool.clone(),
                ice_catheter: equipment.ice_catheter.clone(),
                rx_catheter: self.catheters.rx_catheter.clone(),
            },
        }
    }
}
