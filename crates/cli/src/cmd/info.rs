use anyhow::Result;

use qtmd_lib::platform::Platform;
use qtmd_lib::settings::Settings;

use super::Dirs;
use crate::output::{OutputFormat, print_json, print_stat, print_warning};

pub fn cmd_info(dirs: &Dirs, format: OutputFormat) -> Result<()> {
  let settings = Settings::detect().ok();

  if format.is_json() {
    return print_json(&serde_json::json!({
      "version": env!("CARGO_PKG_VERSION"),
      "platform": Platform::host().map(|p| p.to_string()),
      "settings": settings,
      "store": dirs.store,
      "registry": dirs.registry,
    }));
  }

  println!("System:");
  match Platform::host() {
    Some(platform) => print_stat("Platform", &platform.to_string()),
    None => print_warning("Could not detect platform."),
  }
  if let Some(settings) = settings {
    print_stat("OS", settings.os.as_str());
    print_stat("Compiler", settings.compiler.as_str());
    print_stat("Build type", settings.build_type.as_str());
    print_stat("Arch", settings.arch.as_str());
  }

  println!();
  println!("Paths:");
  print_stat("Store", &dirs.store.display().to_string());
  print_stat("Registry", &dirs.registry.display().to_string());

  Ok(())
}
