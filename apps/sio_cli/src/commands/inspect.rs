// apps/sio_cli/src/commands/inspect.rs

//! 文件查看命令
//!
//! 打印 SCIO 文件的维度、变量、属性与时间槽，可选输出某个变量的数据。

use anyhow::{bail, Context, Result};
use clap::Args;
use sio_pio::format;
use sio_pio::{DimLength, FileImage};
use std::path::PathBuf;
use tracing::info;

/// 查看参数
#[derive(Args)]
pub struct InspectArgs {
    /// 文件路径
    pub file: PathBuf,

    /// 输出该变量的数据
    #[arg(short, long)]
    pub var: Option<String>,

    /// 只解析文件头
    #[arg(long)]
    pub header_only: bool,
}

/// 执行查看命令
pub fn execute(args: InspectArgs) -> Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("无法读取 {}", args.file.display()))?;
    info!(file = %args.file.display(), bytes = bytes.len(), "inspect");

    if args.header_only {
        let catalog = format::decode_header(&bytes)
            .with_context(|| format!("{} 不是有效的 SCIO 文件", args.file.display()))?;
        print_header(&FileImage::new(catalog));
        return Ok(());
    }

    let image = format::decode(&bytes)
        .with_context(|| format!("{} 不是有效的 SCIO 文件", args.file.display()))?;
    print_header(&image);

    if let Some(name) = &args.var {
        print_values(&image, name)?;
    }
    Ok(())
}

fn print_header(image: &FileImage) {
    let catalog = &image.catalog;

    println!("=== 维度 ===");
    for dim in catalog.dimensions_in_order() {
        let len = match dim.length {
            DimLength::Fixed(n) => n.to_string(),
            DimLength::Unlimited => format!("UNLIMITED ({} 个时间槽)", catalog.num_time_slots()),
        };
        println!("  {:<12} = {:<24} {}", dim.name, len, dim.long_name);
    }

    println!("\n=== 变量 ===");
    for var in catalog.variables.values() {
        println!(
            "  {:<12} {:<6} ({}) [{}] {}",
            var.name,
            var.kind.to_string(),
            var.dimensions.join(", "),
            var.units,
            var.long_name
        );
    }

    if !catalog.attributes.is_empty() {
        println!("\n=== 属性 ===");
        for (name, value) in &catalog.attributes {
            println!("  {} = {}", name, value);
        }
    }

    if !catalog.time_values.is_empty() {
        println!("\n=== 时间 ===");
        for (i, t) in catalog.time_values.iter().enumerate() {
            println!("  [{}] {}", i + 1, t);
        }
    }
}

fn print_values(image: &FileImage, name: &str) -> Result<()> {
    let Some(var) = image.catalog.variable(name) else {
        bail!("变量 {} 不存在", name);
    };
    let Some(layout) = image.catalog.layout(name) else {
        bail!("变量 {} 的形状无效", name);
    };
    let fill = var.kind.fill_value();

    println!("\n=== {} ===", name);
    let frames = if layout.record {
        image.catalog.num_time_slots()
    } else {
        1
    };
    for frame in 1..=frames {
        let values = image.frame(name, layout, frame, fill);
        let shown: Vec<String> = values
            .iter()
            .map(|&v| if v == fill { "_".to_string() } else { v.to_string() })
            .collect();
        if layout.record {
            println!("  [t={}] {}", frame, shown.join(" "));
        } else {
            println!("  {}", shown.join(" "));
        }
    }
    Ok(())
}
