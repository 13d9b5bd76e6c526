use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};

lazy_static! {
    pub static ref DATABASE_OPERATION_DURATION: HistogramVec = register_histogram_vec!(
        "scylla_adapter_operation_duration_seconds",
        "Adapter database operation duration in seconds",
        &["operation", "status"]
    ).unwrap();

    pub static ref OPERATION_COUNTER: IntCounterVec = register_int_counter_vec!(
        "scylla_adapter_operations_total",
        "Total number of adapter database operations",
        &["operation", "status"]
    ).unwrap();

    pub static ref ACTIVE_CONNECTIONS: IntGauge = register_int_gauge!(
        "scylla_adapter_active_connections",
        "Number of open adapter connections"
    ).unwrap();
}

pub fn record_operation(operation: &str, success: bool, duration: f64) {
    let status = if success { "success" } else { "failure" };
    DATABASE_OPERATION_DURATION
        .with_label_values(&[operation, status])
        .observe(duration);
    OPERATION_COUNTER
        .with_label_values(&[operation, status])
        .inc();
}
