mod settings;

pub use settings::{
    ConnectivityConfig, ConnectivityMode, DeliveryConfig, LogFormat, LoggingConfig, QueueConfig,
    ServerConfig, Settings, StoreConfig,
};
