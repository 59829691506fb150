//! Audio device enumeration command (C13).

use clap::Args;
use synchro_io::list_devices;

/// List available audio devices (for `input_channel`/`output_channel` node config).
#[derive(Args)]
pub struct DevicesArgs {}

/// Runs the `devices` command.
pub fn run(_args: DevicesArgs) -> anyhow::Result<()> {
    let devices = list_devices()?;

    if devices.is_empty() {
        println!("No audio devices found.");
        return Ok(());
    }

    let inputs: Vec<_> = devices.iter().filter(|d| d.is_input).collect();
    let outputs: Vec<_> = devices.iter().filter(|d| d.is_output).collect();

    if !inputs.is_empty() {
        println!("Input devices:");
        for device in &inputs {
            let also_output = if device.is_output { " (also output)" } else { "" };
            println!("  [{}] {} ({} Hz){}", device.index, device.name, device.default_sample_rate, also_output);
        }
        println!();
    }

    if !outputs.is_empty() {
        println!("Output devices:");
        for device in &outputs {
            let also_input = if device.is_input { " (also input)" } else { "" };
            println!("  [{}] {} ({} Hz){}", device.index, device.name, device.default_sample_rate, also_input);
        }
        println!();
    }

    println!("Total: {} input(s), {} output(s)", inputs.len(), outputs.len());
    println!("Use the index shown above as the `device` field of an input_channel/output_channel node.");

    Ok(())
}
