/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod config;
mod relay;

use crate::config::RelayConfig;
use crate::relay::spawn_relays;
use clap::Parser;
use std::path::PathBuf;
use topic_switch::{BoxError, SwitchOptions, TopicSwitch};
use topic_switch_mqtt::MqttConnector;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct RelayArgs {
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let args = RelayArgs::parse();
    let config = RelayConfig::load(&args.config)?;
    info!(config = %args.config.display(), "Started topic-relay");

    let connector = MqttConnector::new(config.broker.clone());
    let switch = TopicSwitch::new(
        "topic-relay",
        connector,
        SwitchOptions::new(config.switch.clone()),
    )?;
    let relays = spawn_relays(&switch, &config.relays)?;
    switch.start().await?;
    info!(relays = relays.len(), "relaying; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("stopping topic-relay");
    for relay in &relays {
        relay.abort();
    }
    switch.stop().await?;

    Ok(())
}
