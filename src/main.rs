use clap::{Parser, ValueEnum};
use jsse_binary::runtime::DataViewInfo;
use jsse_binary::{JsObject, MemUsageBudget, Runtime, TypedArrayKind, estimate_memory};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Endian {
    Big,
    Little,
}

#[derive(Parser)]
#[command(
    name = "jsse-binary",
    version,
    about = "Inspect bytes through JavaScript typed arrays and DataViews"
)]
struct Cli {
    /// File whose contents back the ArrayBuffer
    file: Option<PathBuf>,

    /// Buffer contents as a hex string
    #[arg(long, conflicts_with = "file")]
    hex: Option<String>,

    /// Element type, e.g. uint8, int16, float64, biguint64
    #[arg(short, long, default_value = "uint8")]
    kind: String,

    /// Read through a DataView instead of a typed array
    #[arg(long)]
    data_view: bool,

    /// Byte offset of the view
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Element count (typed arrays) or byte length (data views)
    #[arg(long)]
    length: Option<usize>,

    /// Byte order for DataView reads
    #[arg(long, value_enum, default_value_t = Endian::Big)]
    endian: Endian,

    /// Detach the buffer after printing
    #[arg(long)]
    detach: bool,

    /// Print the memory estimate of the view
    #[arg(long)]
    estimate: bool,

    #[arg(long)]
    max_depth: Option<usize>,

    #[arg(long)]
    max_objects: Option<usize>,

    #[arg(long)]
    max_total: Option<u64>,

    #[arg(long)]
    max_string_bytes: Option<u64>,

    /// Raise log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn budget(&self) -> MemUsageBudget {
        let mut budget = MemUsageBudget::default();
        if let Some(n) = self.max_depth {
            budget = budget.with_max_depth(n);
        }
        if let Some(n) = self.max_objects {
            budget = budget.with_max_objects(n);
        }
        if let Some(n) = self.max_total {
            budget = budget.with_max_total(n);
        }
        if let Some(n) = self.max_string_bytes {
            budget = budget.with_max_string_bytes(n);
        }
        budget
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_bytes(cli: &Cli) -> Result<Vec<u8>, String> {
    if let Some(ref text) = cli.hex {
        let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        return hex::decode(cleaned).map_err(|e| format!("invalid hex input: {e}"));
    }
    match cli.file {
        Some(ref path) => read_file(path),
        None => Ok(Vec::new()),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))
}

fn print_typed_array(rt: &mut Runtime, view: &JsObject) -> Result<(), String> {
    for key in rt.own_property_keys(view) {
        let value = rt.get(view, &key).map_err(|e| e.to_string())?;
        println!("[{key}] {value}");
    }
    Ok(())
}

fn print_data_view(
    rt: &Runtime,
    view: &JsObject,
    kind: TypedArrayKind,
    little_endian: bool,
) -> Result<(), String> {
    let byte_length = view
        .borrow()
        .data_view_info
        .as_ref()
        .map_or(Ok(0), DataViewInfo::view_byte_length)
        .map_err(|e| e.to_string())?;
    let size = kind.bytes_per_element();
    for index in (0..byte_length / size).map(|i| i * size) {
        let value = rt
            .data_view_get_value(view, kind, index, little_endian)
            .map_err(|e| e.to_string())?;
        println!("[+{index}] {value}");
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), String> {
    let kind = TypedArrayKind::from_name(&cli.kind)
        .ok_or_else(|| format!("unknown element type: {}", cli.kind))?;
    if cli.data_view && kind == TypedArrayKind::Uint8Clamped {
        return Err("DataView has no Uint8Clamped accessors".to_string());
    }
    let bytes = load_bytes(cli)?;
    let mut rt = Runtime::new();
    let buffer = rt.new_array_buffer(bytes);
    let view = if cli.data_view {
        rt.new_data_view(&buffer, cli.offset, cli.length)
    } else {
        rt.new_typed_array(kind, &buffer, cli.offset, cli.length)
    }
    .map_err(|e| e.to_string())?;

    if cli.data_view {
        print_data_view(&rt, &view, kind, matches!(cli.endian, Endian::Little))?;
    } else {
        print_typed_array(&mut rt, &view)?;
    }

    if cli.detach && buffer.detach() {
        println!("detached; view length is now {}", rt.own_property_keys(&view).len());
    }

    if cli.estimate {
        let usage = estimate_memory(Some(&view), &cli.budget()).map_err(|e| e.to_string())?;
        println!("memory: {usage}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(1)
        }
    }
}
