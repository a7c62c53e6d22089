//! wordvm - CLI Entry Point
//!
//! Commands:
//! - `wordvm run <program>` - Run a word-code image to halt
//! - `wordvm disasm <program>` - Disassemble an image
//! - `wordvm test` - Run the built-in self-test

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wordvm")]
#[command(version = "0.1.0")]
#[command(about = "An emulator for a sparse-memory integer word-code virtual machine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the comma-separated program image
        program: String,
        /// Maximum number of cycles to run (default: 1000000)
        #[arg(short, long, default_value = "1000000")]
        max_cycles: u64,
        /// Show a register/memory trace after each cycle
        #[arg(short, long)]
        trace: bool,
        /// Answer input requests with these values before prompting
        #[arg(short, long)]
        input: Vec<i64>,
        /// Write the final machine state to a JSON file
        #[arg(long)]
        dump_state: Option<String>,
    },
    /// Disassemble a program image to readable word-code
    Disasm {
        /// Path to the comma-separated program image
        program: String,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            program,
            max_cycles,
            trace,
            input,
            dump_state,
        }) => {
            run_program(&program, max_cycles, trace, input, dump_state);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("wordvm v0.1.0");
            println!("A word-code virtual machine");
            println!();
            println!("Use --help for available commands");
            println!();
            demo_self_reproducing_program();
        }
    }
}

fn run_program(path: &str, max_cycles: u64, trace: bool, input: Vec<i64>, dump_state: Option<String>) {
    use wordvm::program::disasm::disassemble_instruction;
    use wordvm::{load_image, Machine, StdioBus};

    let image = match load_image(path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    if image.is_empty() {
        eprintln!("❌ No words to execute");
        std::process::exit(1);
    }
    println!("📂 Loaded {} words from {}", image.len(), path);

    let mut machine = Machine::from_image(&image);
    let mut bus = StdioBus::with_inputs(input);

    println!();
    println!("━━━ Execution ━━━");

    let mut cycles = 0u64;
    let mut seen_diagnostics = 0usize;
    while machine.is_running() && cycles < max_cycles {
        let at = machine.regs.ip;

        match machine.step(&mut bus) {
            Ok(instr) => {
                cycles += 1;
                if trace {
                    println!(
                        "{:>4}: {:<32} ip={} rb={}",
                        at,
                        disassemble_instruction(&instr.words),
                        machine.regs.ip,
                        machine.regs.relative_base
                    );
                    for diag in &machine.diagnostics()[seen_diagnostics..] {
                        println!("      note: {}", diag);
                    }
                    seen_diagnostics = machine.diagnostics().len();
                    println!("      mem: {}", format_memory(&machine));
                }
            }
            Err(fault) => {
                eprintln!("❌ Machine fault at ip={}: {}", at, fault);
                let code = if fault.is_input() { 2 } else { 1 };
                std::process::exit(code);
            }
        }
    }

    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", cycles);
    println!("State: {:?}", machine.state);
    println!("ip: {}", machine.regs.ip);
    println!("relative base: {}", machine.regs.relative_base);
    println!("set memory cells: {}", machine.mem.set_cells());
    if !machine.diagnostics().is_empty() {
        println!("diagnostics: {}", machine.diagnostics().len());
    }

    if let Some(out_path) = dump_state {
        match serde_json::to_string_pretty(&machine) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&out_path, json) {
                    eprintln!("❌ Failed to write state: {}", e);
                    std::process::exit(1);
                }
                println!("✓ State written to {}", out_path);
            }
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
    }

    if cycles >= max_cycles && machine.is_running() {
        println!();
        println!(
            "⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.",
            max_cycles
        );
    }
}

fn format_memory(machine: &wordvm::Machine) -> String {
    let cells: Vec<String> = machine
        .mem
        .dump()
        .iter()
        .map(|(addr, word)| format!("{}:{}", addr, word))
        .collect();
    format!("{{{}}}", cells.join(" "))
}

fn disassemble_file(path: &str) {
    use wordvm::{disassemble, load_image};

    let image = match load_image(path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    println!("📖 Disassembling: {} ({} words)", path, image.len());
    println!();
    print!("{}", disassemble(&image));
}

fn demo_self_reproducing_program() {
    use wordvm::{Machine, ScriptedBus};

    println!("━━━ Demo: self-reproducing program ━━━");
    println!();

    let image = [
        109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
    ];
    println!("image:  {:?}", image);

    let mut machine = Machine::from_image(&image);
    let mut bus = ScriptedBus::new();
    match machine.run(&mut bus) {
        Ok(cycles) => {
            println!("output: {:?}", bus.outputs());
            println!();
            if bus.outputs() == image {
                println!("✓ The program emitted its own image in {} cycles", cycles);
            } else {
                println!("✗ Output does not match the image");
            }
        }
        Err(e) => println!("✗ Machine fault: {}", e),
    }
}

fn run_self_test() {
    use wordvm::{Machine, ScriptedBus};

    println!("━━━ wordvm Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, ok: bool| {
        if ok {
            println!("{}... ✓", name);
            passed += 1;
        } else {
            println!("{}... ✗", name);
            failed += 1;
        }
    };

    // Test 1: add/multiply program leaves 3500 at address 0
    let mut machine = Machine::from_image(&[1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50]);
    let mut bus = ScriptedBus::new();
    let ok = machine.run(&mut bus).is_ok() && machine.mem.read(0).unwrap_or(0) == 3500;
    check("add/multiply program", ok);

    // Test 2: parameter modes write 99 beside the instruction
    let mut machine = Machine::from_image(&[1002, 4, 3, 4, 33]);
    let mut bus = ScriptedBus::new();
    let ok = machine.run(&mut bus).is_ok() && machine.mem.read(4).unwrap_or(0) == 99;
    check("immediate-mode multiply", ok);

    // Test 3: large value output
    let mut machine = Machine::from_image(&[104, 1_125_899_906_842_624, 99]);
    let mut bus = ScriptedBus::new();
    let ok = machine.run(&mut bus).is_ok() && bus.outputs() == [1_125_899_906_842_624];
    check("large immediate output", ok);

    // Test 4: input copies through to output
    let mut machine = Machine::from_image(&[3, 0, 4, 0, 99]);
    let mut bus = ScriptedBus::with_inputs([7]);
    let ok = machine.run(&mut bus).is_ok() && bus.outputs() == [7];
    check("input/output round-trip", ok);

    // Test 5: the self-reproducing program
    let image = [
        109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
    ];
    let mut machine = Machine::from_image(&image);
    let mut bus = ScriptedBus::new();
    let ok = machine.run(&mut bus).is_ok() && bus.outputs() == image;
    check("self-reproducing program", ok);

    // Test 6: unknown opcode faults instead of halting
    let mut machine = Machine::from_image(&[98]);
    let mut bus = ScriptedBus::new();
    let ok = machine.run(&mut bus).is_err() && !machine.is_halted();
    check("unknown opcode faults", ok);

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
