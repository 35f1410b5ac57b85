/// Static description of a table the model is allowed to query.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl TableSchema {
    pub fn column_list(&self) -> String {
        self.columns.join(", ")
    }
}

pub const FORECAST_RESULT: TableSchema = TableSchema {
    name: "forecast_result",
    columns: &[
        "model_name",
        "strategy_args",
        "model_params",
        "mae",
        "mse",
        "rmse",
        "mape",
        "smape",
        "mase",
        "file_name",
        "fit_time",
        "inference_time",
    ],
};
