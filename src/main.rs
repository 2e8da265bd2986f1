use anyhow::Context;
use clap::Parser;
use gsm_gatekeeper::adapters::gpio::SYSFS_GPIO_ROOT;
use gsm_gatekeeper::adapters::{LogOnlyGate, NoopPower, SerialTransport, SimulatedModem, SysfsGpio};
use gsm_gatekeeper::domain::ports::{GateActuator, PowerControl, Transport};
use gsm_gatekeeper::utils::error::{ErrorSeverity, GateError};
use gsm_gatekeeper::utils::{logger, validation::Validate};
use gsm_gatekeeper::{CliArgs, GateContext, GatekeeperConfig, Modem};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚪 Starting gatekeeper");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    if let Err(e) = run(args).await {
        let exit_code = match e.downcast_ref::<GateError>() {
            Some(gate_error) => {
                tracing::error!(
                    "❌ Gatekeeper failed: {:#} (Category: {:?}, Severity: {:?})",
                    e,
                    gate_error.category(),
                    gate_error.severity()
                );
                tracing::error!("💡 Recovery suggestion: {}", gate_error.recovery_suggestion());
                eprintln!("❌ {}", gate_error.user_friendly_message());
                eprintln!("💡 建議: {}", gate_error.recovery_suggestion());

                // 根據錯誤嚴重程度決定退出碼
                match gate_error.severity() {
                    ErrorSeverity::Low => 0,
                    ErrorSeverity::Medium => 2,
                    ErrorSeverity::High => 1,
                    ErrorSeverity::Critical => 3,
                }
            }
            None => {
                tracing::error!("❌ Gatekeeper failed: {:#}", e);
                eprintln!("❌ {:#}", e);
                1
            }
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = GatekeeperConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    // 驗證配置
    config.validate()?;
    tracing::info!(
        "✅ Configuration loaded: port {}, {} admin number(s)",
        config.modem.port,
        config.access.admin_numbers.len()
    );

    if args.dry_run {
        println!("✅ Configuration is valid");
        println!("{:#?}", config.to_settings());
        return Ok(());
    }

    let (power, gate) = gpio_from_config(&config).await?;

    if args.simulate {
        tracing::info!("🧪 Using simulated SIM800");
        let modem = Modem::new("simulator", SimulatedModem::default(), config.timings());
        serve(modem, &config, &args, power, gate).await
    } else {
        let transport = SerialTransport::open(&config.modem.port, config.modem.baud_rate)
            .with_context(|| format!("opening serial port {}", config.modem.port))?;
        let modem = Modem::new(config.modem.port.clone(), transport, config.timings());
        serve(modem, &config, &args, power, gate).await
    }
}

async fn gpio_from_config(
    config: &GatekeeperConfig,
) -> anyhow::Result<(Box<dyn PowerControl>, Box<dyn GateActuator>)> {
    let Some(gpio) = &config.gpio else {
        return Ok((Box::new(NoopPower), Box::new(LogOnlyGate)));
    };
    let root = gpio.sysfs_root.as_deref().unwrap_or(SYSFS_GPIO_ROOT);

    let power: Box<dyn PowerControl> = match gpio.power_pin {
        Some(pin) => {
            let pin = SysfsGpio::with_root(root, pin, config.timings().power_pulse);
            pin.export()
                .await
                .with_context(|| format!("exporting power GPIO {}", pin.pin()))?;
            Box::new(pin)
        }
        None => Box::new(NoopPower),
    };

    let gate: Box<dyn GateActuator> = match gpio.gate_pin {
        Some(pin) => {
            let pin = SysfsGpio::with_root(root, pin, config.gate_pulse());
            pin.export()
                .await
                .with_context(|| format!("exporting gate GPIO {}", pin.pin()))?;
            Box::new(pin)
        }
        None => Box::new(LogOnlyGate),
    };

    Ok((power, gate))
}

async fn serve<T: Transport + 'static>(
    modem: Modem<T>,
    config: &GatekeeperConfig,
    args: &CliArgs,
    power: Box<dyn PowerControl>,
    gate: Box<dyn GateActuator>,
) -> anyhow::Result<()> {
    let modem = Arc::new(modem);

    if args.skip_bring_up {
        tracing::warn!("Skipping modem bring-up");
        modem.configure_notifications().await?;
    } else {
        modem.init_device(power.as_ref(), &config.modem.apn).await?;
    }

    let ctx = Arc::new(GateContext::new(Arc::clone(&modem), config.to_settings(), gate));

    if args.list_contacts {
        let contacts = ctx.store().snapshot().await?;
        if args.json_logs {
            println!("{}", serde_json::to_string_pretty(&contacts)?);
            return Ok(());
        }
        println!("📇 {} contact(s) on SIM", contacts.len());
        for entry in contacts {
            println!(
                "{:>4}  {:<16} {:>3}  {}",
                entry.index,
                entry.number,
                entry.number_type.code(),
                entry.name
            );
        }
        return Ok(());
    }

    let tasks = ctx.spawn();
    tracing::info!("✅ Gatekeeper running, press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;
    ctx.shutdown();
    tasks.join().await;

    tracing::info!("👋 Gatekeeper stopped");
    Ok(())
}
