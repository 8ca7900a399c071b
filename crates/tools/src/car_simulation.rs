//! Toy car-simulation API used by the `car_simulation` toolset.

use async_trait::async_trait;
use ragent_core::error::ToolError;
use ragent_core::tool::{ParameterKind, Tool, ToolArguments, ToolParameter};
use serde_json::Value;
use tracing::info;

pub struct SpawnCarTool;

#[async_trait]
impl Tool for SpawnCarTool {
    fn name(&self) -> &str {
        "spawn_car"
    }

    fn description(&self) -> &str {
        "Spawns a car in the simulation with the given ID and model."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::optional("car_id", ParameterKind::String, "The ID of the car to spawn", "Car1"),
            ToolParameter::optional("model", ParameterKind::String, "The model of the car", "Sedan"),
        ]
    }

    async fn execute(&self, args: ToolArguments) -> Result<Value, ToolError> {
        let car_id = args.str("car_id")?;
        let model = args.str("model")?;
        info!(car_id, model, "Spawning car");
        Ok(Value::String(format!("Car '{car_id}' of model '{model}' has been spawned.")))
    }
}

pub struct DeleteCarTool;

#[async_trait]
impl Tool for DeleteCarTool {
    fn name(&self) -> &str {
        "delete_car"
    }

    fn description(&self) -> &str {
        "Deletes a car from the simulation by its ID."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::optional(
            "car_id",
            ParameterKind::String,
            "The ID of the car to delete",
            "Car1",
        )]
    }

    async fn execute(&self, args: ToolArguments) -> Result<Value, ToolError> {
        let car_id = args.str("car_id")?;
        info!(car_id, "Deleting car");
        Ok(Value::String(format!("Car '{car_id}' has been deleted from the simulation.")))
    }
}
