// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Command line entry point of the persistor.
//!
//! `polodb-persistor serve --config persistor.json` opens the store, starts
//! the persistor on an in-process bus and exposes that bus through a line
//! delimited JSON bridge (`localhost:27018` unless configured).
//!
//! Each line sent to the bridge is `{"address": "vertx.mongopersistor", "body": {...}}`
//! and each line received back is the reply body.

use std::path::PathBuf;
use clap::{Arg, ArgAction, Command as App};
use anyhow::{anyhow, Result};
use log::{error, info, LevelFilter};
use tokio_util::sync::CancellationToken;
use polodb_persistor::bridge::start_bridge;
use polodb_persistor::{EventBus, Persistor, PersistorConfig};

const DEFAULT_BRIDGE: &str = "localhost:27018";

#[tokio::main]
async fn main() {
    let app = App::new("polodb-persistor")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Bus persistor backed by PoloDB")
        .author("Vincent Chan <okcdz@diverse.space>")
        .subcommand(App::new("serve")
            .about("open the store, start the persistor and the json bridge")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("the json config file")
                    .num_args(1)
            )
            .arg(
                Arg::new("address")
                    .long("address")
                    .help("the bus address to listen on")
                    .num_args(1)
            )
            .arg(
                Arg::new("path")
                    .short('p')
                    .long("path")
                    .value_name("PATH")
                    .num_args(1)
            )
            .arg(
                Arg::new("fake")
                    .long("fake")
                    .help("use a throwaway store")
                    .action(ArgAction::SetTrue)
            )
            .arg(
                Arg::new("bridge")
                    .long("bridge")
                    .help("the bridge listen address")
                    .num_args(1)
            )
            .arg(
                Arg::new("log")
                    .help("print debug log")
                    .long("log")
                    .short('l')
                    .action(ArgAction::SetTrue)
            )
        );

    let matches = app.get_matches();

    if let Some(sub) = matches.subcommand_matches("serve") {
        let mut logger = env_logger::Builder::from_default_env();
        if sub.get_flag("log") {
            logger.filter_level(LevelFilter::Debug);
        }
        logger.init();

        let config = match load_config(sub) {
            Ok(config) => config,
            Err(e) => {
                error!("error: {:?}", e);
                std::process::exit(2);
            }
        };

        if let Err(e) = serve(config).await {
            error!("error: {:?}", e);
            std::process::exit(1);
        }
        return;
    }

    eprintln!("you should pass a subcommand, try --help");
}

fn load_config(sub: &clap::ArgMatches) -> Result<PersistorConfig> {
    let mut config = match sub.get_one::<String>("config") {
        Some(path) => PersistorConfig::from_file(path)?,
        None => PersistorConfig::default(),
    };

    if let Some(address) = sub.get_one::<String>("address") {
        config.address = address.clone();
    }
    if let Some(path) = sub.get_one::<String>("path") {
        config.path = Some(PathBuf::from(path));
    }
    if sub.get_flag("fake") {
        config.fake = true;
    }
    if let Some(bridge) = sub.get_one::<String>("bridge") {
        config.bridge = Some(bridge.clone());
    }

    Ok(config)
}

async fn serve(config: PersistorConfig) -> Result<()> {
    let persistor = Persistor::open(&config)?;
    let bus = EventBus::new();
    let token = CancellationToken::new();

    let persistor_fut = persistor
        .start(&bus, token.clone())
        .map_err(|e| anyhow!("start persistor: {}", e))?;

    let socket = config.bridge.clone().unwrap_or_else(|| DEFAULT_BRIDGE.to_string());
    let (addr, bridge_fut) = start_bridge(bus, socket, token.clone()).await?;
    info!("listening on {}, bus address {}", addr, config.address);

    tokio::signal::ctrl_c().await?;
    info!("received quit signal, prepare to exit");
    token.cancel();

    bridge_fut.await?;
    persistor_fut.await?;
    info!("safely exit");
    Ok(())
}
