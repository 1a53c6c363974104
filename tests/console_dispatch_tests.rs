//! Command dispatch tests

use std::sync::{Arc, Mutex};

use knx_console::console::{
    print_help_line, Builtin, CommandContext, Console, ConsoleConfig, Dispatch,
};
use knx_console::logging::{Logger, LoggerConfig};
use knx_console::platform::{Capabilities, DirEntry, PlatformCall, SimPlatform};
use knx_console::transport::MemoryTransport;
use knx_console::Module;

struct Fixture {
    console: Console,
    capture: MemoryTransport,
    platform: Arc<SimPlatform>,
}

fn fixture_with(platform: SimPlatform, config: ConsoleConfig) -> Fixture {
    let capture = MemoryTransport::new();
    let platform = Arc::new(platform);
    let logger = Arc::new(Logger::new(
        capture.clone(),
        platform.clone(),
        LoggerConfig {
            interactive: false,
            ..Default::default()
        },
    ));
    let console = Console::new(logger, platform.clone(), config);
    Fixture {
        console,
        capture,
        platform,
    }
}

fn fixture() -> Fixture {
    fixture_with(SimPlatform::new(), ConsoleConfig::default())
}

/// Module answering a fixed set of commands and recording what it was offered.
struct TestModule {
    name: &'static str,
    handles: &'static [&'static str],
    offered: Arc<Mutex<Vec<String>>>,
}

impl TestModule {
    fn new(
        name: &'static str,
        handles: &'static [&'static str],
    ) -> (Self, Arc<Mutex<Vec<String>>>) {
        let offered = Arc::new(Mutex::new(Vec::new()));
        let module = Self {
            name,
            handles,
            offered: offered.clone(),
        };
        (module, offered)
    }
}

impl Module for TestModule {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> &str {
        "0.4.2"
    }

    fn process_command(&mut self, cmd: &str, context: &CommandContext<'_>) -> bool {
        self.offered.lock().unwrap().push(cmd.to_string());
        if self.handles.contains(&cmd) {
            context.logger().log_fmt(self.name, format_args!("handled {}", cmd));
            return true;
        }
        false
    }

    fn show_informations(&self, logger: &Logger) {
        logger.log_fmt(self.name, format_args!("channels: 8"));
    }

    fn show_help(&self, logger: &Logger) {
        print_help_line(logger, "ping", "Answer with pong");
    }
}

#[test]
fn test_help_and_alias_render_identically() {
    let mut fx = fixture();

    assert_eq!(fx.console.dispatch("help"), Dispatch::Builtin(Builtin::Help));
    let long = fx.capture.take();

    assert_eq!(fx.console.dispatch("h"), Dispatch::Builtin(Builtin::Help));
    let short = fx.capture.take();

    assert_eq!(long, short);
    assert!(long.contains("| nuke all | Erase all |"));
}

#[test]
fn test_unknown_command_logs_once_without_side_effects() {
    let mut fx = fixture();

    assert_eq!(fx.console.dispatch("xyz"), Dispatch::Unknown);

    let out = fx.capture.contents();
    assert_eq!(out.matches("unknown command xyz").count(), 1);
    assert_eq!(out.lines().count(), 1);
    assert!(fx.platform.calls().is_empty());
}

#[test]
fn test_matching_is_exact() {
    let mut fx = fixture();

    assert_eq!(fx.console.dispatch("Help"), Dispatch::Unknown);
    assert_eq!(fx.console.dispatch("res"), Dispatch::Unknown);
    assert_eq!(fx.console.dispatch("nuke"), Dispatch::Unknown);
    assert!(fx.platform.calls().is_empty());
}

#[test]
fn test_builtins_call_platform() {
    let mut fx = fixture();

    fx.console.dispatch("prog");
    fx.console.dispatch("powerloss");
    fx.console.dispatch("save");
    fx.console.dispatch("bootloader");
    fx.console.dispatch("restart");
    fx.console.dispatch("fatal");

    assert_eq!(
        fx.platform.calls(),
        vec![
            PlatformCall::ToggleProgMode,
            PlatformCall::TriggerSavePin,
            PlatformCall::Save,
            PlatformCall::ResetToBootloader,
            PlatformCall::Delay(20),
            PlatformCall::Restart,
            PlatformCall::FatalError {
                code: 5,
                message: "Test with 5x blinking".to_string()
            },
        ]
    );
}

#[test]
fn test_sleep_duration() {
    let mut fx = fixture();
    fx.console.dispatch("sleep");
    assert_eq!(fx.platform.calls(), vec![PlatformCall::Delay(20_000)]);
    assert!(fx.capture.contents().contains("sleep up to 20 seconds"));

    let watchdog = fixture_with(
        SimPlatform::new(),
        ConsoleConfig {
            watchdog_max_period_ms: Some(30_000),
            ..Default::default()
        },
    );
    assert_eq!(watchdog.console.sleep_time(), 30_001);

    let short_watchdog = fixture_with(
        SimPlatform::new(),
        ConsoleConfig {
            watchdog_max_period_ms: Some(8_000),
            ..Default::default()
        },
    );
    assert_eq!(short_watchdog.console.sleep_time(), 20_000);
}

#[test]
fn test_maintenance_commands_need_capability() {
    let basic = SimPlatform::new().with_capabilities(Capabilities {
        dual_core: false,
        maintenance: false,
    });
    let mut fx = fixture_with(basic, ConsoleConfig::default());

    for cmd in ["files", "bootloader", "nuke knx", "nuke openknx", "nuke files", "nuke all"] {
        assert_eq!(fx.console.dispatch(cmd), Dispatch::Unknown, "{}", cmd);
    }
    assert!(fx.platform.calls().is_empty());

    fx.console.dispatch("help");
    let help = fx.capture.contents();
    assert!(!help.contains("| nuke all |"));
    assert!(help.contains("| prog | Toggle the ProgMode |"));
}

#[test]
fn test_modules_asked_in_registration_order() {
    let mut fx = fixture();
    let (first, first_offered) = TestModule::new("First", &["ping"]);
    let (second, second_offered) = TestModule::new("Second", &["ping", "pong"]);
    fx.console.register(Box::new(first));
    fx.console.register(Box::new(second));

    assert_eq!(fx.console.dispatch("ping"), Dispatch::Module(0));
    assert_eq!(fx.console.dispatch("pong"), Dispatch::Module(1));
    assert_eq!(fx.console.dispatch("nope"), Dispatch::Unknown);

    assert_eq!(*first_offered.lock().unwrap(), vec!["ping", "pong", "nope"]);
    // First wins on "ping", so the second module never sees it
    assert_eq!(*second_offered.lock().unwrap(), vec!["pong", "nope"]);

    let out = fx.capture.contents();
    assert!(out.contains("handled ping"));
    assert!(out.contains("handled pong"));
    assert_eq!(out.matches("unknown command").count(), 1);
}

#[test]
fn test_builtins_shadow_modules() {
    let mut fx = fixture();
    let (module, offered) = TestModule::new("Greedy", &["save"]);
    fx.console.register(Box::new(module));

    assert_eq!(fx.console.dispatch("save"), Dispatch::Builtin(Builtin::Save));
    assert!(offered.lock().unwrap().is_empty());
}

#[test]
fn test_information_report() {
    let mut fx = fixture();
    let (module, _) = TestModule::new("Logic", &[]);
    fx.console.register(Box::new(module));

    fx.console.dispatch("info");
    let out = fx.capture.contents();

    assert!(out.contains("════ Information ════"));
    assert!(out.contains("KNX Address"));
    assert!(out.contains("1.1.255"));
    assert!(out.contains("00FA:1234ABCD"));
    assert!(out.contains("Single-Core (Temperature 27.5 °C)"));
    assert!(out.contains("180.00 KiB (min. 150.00 KiB)"));
    assert!(out.contains("Logic"));
    assert!(out.contains("0.4.2"));
    assert!(out.contains("channels: 8"));
}

#[test]
fn test_cpu_mode_with_and_without_sensor() {
    let dual = Capabilities {
        dual_core: true,
        maintenance: true,
    };

    let mut fx = fixture_with(
        SimPlatform::new()
            .with_capabilities(dual)
            .with_temperature(Some(41.26)),
        ConsoleConfig::default(),
    );
    fx.console.dispatch("info");
    assert!(fx.capture.contents().contains("Dual-Core (Temperature 41.3 °C)"));

    let mut fx = fixture_with(
        SimPlatform::new().with_temperature(None),
        ConsoleConfig::default(),
    );
    fx.console.dispatch("info");
    let out = fx.capture.contents();
    let row = out.lines().find(|l| l.starts_with("CPU-Mode")).unwrap();
    assert!(row.ends_with("Single-Core"));
    assert!(!out.contains("Temperature"));
}

#[test]
fn test_help_includes_module_rows() {
    let mut fx = fixture();
    let (module, _) = TestModule::new("Pinger", &["ping"]);
    fx.console.register(Box::new(module));

    fx.console.dispatch("help");
    let out = fx.capture.contents();

    let builtin = out.find("| restart |").unwrap();
    let from_module = out.find("| ping | Answer with pong |").unwrap();
    assert!(builtin < from_module);
}

#[test]
fn test_filesystem_listing_recurses() {
    let platform = SimPlatform::new()
        .with_directory("/", vec![DirEntry::file("knx.bin", 512), DirEntry::dir("logic")])
        .with_directory("/logic/", vec![DirEntry::file("state.dat", 64)]);
    let mut fx = fixture_with(platform, ConsoleConfig::default());

    assert_eq!(fx.console.dispatch("files"), Dispatch::Builtin(Builtin::Files));
    let out = fx.capture.contents();

    let root = out.find("/knx.bin (512 bytes)").unwrap();
    let dir = out.find("/logic/\r\n").unwrap();
    let nested = out.find("/logic/state.dat (64 bytes)").unwrap();
    assert!(root < dir && dir < nested);
}
