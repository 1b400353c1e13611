use std::io;

use anyhow::Context;
use byteorder::{NativeEndian, ReadBytesExt};
use chrono::Utc;
use clap::Parser;
use log::{info, warn, LevelFilter};

use samecodec::{
    Message, MessageBuilder, MessageHeader, Modulator, ModulatorConfig, Originator,
    SameDecoderBuilder, Subdivision,
};

mod audio;
mod cli;

use cli::{Args, CliError, Command, DecodeArgs, EncodeArgs, EncodeRawArgs, EomArgs, ListenArgs};

fn main() {
    match samewav() {
        Ok(()) => {}
        Err(cli_error) => cli_error.exit(),
    }
}

fn samewav() -> Result<(), CliError> {
    let args = Args::try_parse()?;
    log_setup(&args);

    match &args.command {
        Command::Encode(enc) => run_encode(&args, enc)?,
        Command::EncodeRaw(enc) => run_encode_raw(&args, enc)?,
        Command::Eom(eom) => run_eom(eom)?,
        Command::Decode(dec) => run_decode(&args, dec)?,
        Command::Listen(listen) => run_listen(&args, listen)?,
    }

    Ok(())
}

fn run_encode(args: &Args, enc: &EncodeArgs) -> Result<(), anyhow::Error> {
    let mut builder = MessageBuilder::new()
        .with_event(enc.event.to_ascii_uppercase())
        .with_callsign(enc.callsign.to_ascii_uppercase());

    for location in &enc.locations {
        builder = builder
            .with_location_str(location)
            .context("bad --location")?;
    }

    let (hours, minutes) = parse_duration(&enc.duration)?;
    builder = builder.with_duration(hours, minutes);

    builder = match &enc.timestamp {
        Some(stamp) => {
            let (day, hour, minute) = parse_timestamp(stamp)?;
            builder.with_issue_daytime(day, hour, minute)
        }
        None => builder.with_issue_datetime(&Utc::now()),
    };

    if let Some(orig) = &enc.originator {
        builder = builder.with_originator(parse_originator(orig)?);
    }

    let header = builder.build().context("message validation failed")?;
    if !args.quiet {
        println!("{}", header);
    }

    write_modulated(&header, enc.rate, enc.eom, &enc.output)
}

fn run_encode_raw(args: &Args, enc: &EncodeRawArgs) -> Result<(), anyhow::Error> {
    let header = MessageHeader::new(enc.header.clone()).context("invalid SAME header text")?;
    if !args.quiet {
        println!("{}", header);
    }

    write_modulated(&header, enc.rate, enc.eom, &enc.output)
}

fn run_eom(eom: &EomArgs) -> Result<(), anyhow::Error> {
    let modulator = Modulator::new(ModulatorConfig::new().with_sample_rate(eom.rate));
    audio::write_wav(&eom.output, &modulator.end_of_message(), eom.rate)
}

fn run_decode(args: &Args, dec: &DecodeArgs) -> Result<(), anyhow::Error> {
    let (mut samples, source_rate) = audio::read_wav(&dec.input)?;
    if source_rate != dec.rate {
        info!("resampling {} Hz -> {} Hz", source_rate, dec.rate);
        samples = audio::resample_linear(&samples, source_rate, dec.rate);
    }

    let mut decoder = SameDecoderBuilder::new(dec.rate).build();
    let messages = decoder
        .decode_buffer(&samples)
        .context("unable to decode audio")?;

    if messages.is_empty() {
        if !args.quiet {
            println!("no SAME messages found");
        }
        return Ok(());
    }

    for msg in &messages {
        print_message(msg, args.quiet);
    }
    Ok(())
}

fn run_listen(args: &Args, listen: &ListenArgs) -> Result<(), anyhow::Error> {
    info!("SAME decoder reading raw i16 PCM from standard input");

    let stdin = io::stdin();
    let mut input = io::BufReader::new(stdin.lock());
    let mut session = SameDecoderBuilder::new(listen.rate).build();

    let mut chunk: Vec<f32> = Vec::with_capacity(listen.chunk);
    let mut eof = false;
    while !eof {
        chunk.clear();
        while chunk.len() < listen.chunk {
            match input.read_i16::<NativeEndian>() {
                Ok(sample) => chunk.push(sample as f32 / -(i16::MIN as f32)),
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                    eof = true;
                    break;
                }
                Err(err) => return Err(err).context("error reading standard input"),
            }
        }

        for msg in session.process(&chunk) {
            print_message(&msg, args.quiet);
        }
    }

    info!(
        "stream ended after {} samples",
        session.input_sample_counter()
    );
    Ok(())
}

fn write_modulated(
    header: &MessageHeader,
    rate: u32,
    eom: bool,
    output: &std::path::Path,
) -> Result<(), anyhow::Error> {
    let modulator = Modulator::new(
        ModulatorConfig::new()
            .with_sample_rate(rate)
            .with_end_of_message(eom),
    );
    audio::write_wav(output, &modulator.modulate(header), rate)
}

// Print one decoded message; verbose field breakdown unless quiet
fn print_message(msg: &Message, quiet: bool) {
    match msg {
        Message::Header(hdr) => {
            println!("{}", hdr.as_str());
            if quiet {
                return;
            }
            println!(
                "  originator: {} ({})",
                hdr.originator().as_display_str(),
                hdr.originator_str()
            );
            println!(
                "  event:      {} ({})",
                hdr.event_name().unwrap_or("Unknown Event"),
                hdr.event_str()
            );
            for location in hdr.locations() {
                match location.subdivision() {
                    Subdivision::Whole => println!("  location:   {}", location),
                    part => println!("  location:   {} ({})", location, part),
                }
            }
            let (hours, minutes) = hdr.valid_duration_fields();
            println!("  valid for:  {} h {:02} min", hours, minutes);
            let (day, hour, minute) = hdr.issue_daytime_fields();
            match hdr.issue_datetime(&Utc::now()) {
                Ok(when) => println!(
                    "  issued:     day {:03} {:02}:{:02} UTC ({})",
                    day,
                    hour,
                    minute,
                    when.format("%Y-%m-%d %H:%M")
                ),
                Err(_e) => println!("  issued:     day {:03} {:02}:{:02} UTC", day, hour, minute),
            }
            println!("  from:       {}", hdr.callsign());
        }
        Message::Partial(part) => {
            println!("{}", part.raw);
            if quiet {
                return;
            }
            println!("  (partial: some fields missing or unparseable)");
            if let Some(org) = &part.originator {
                println!("  originator: {}", org);
            }
            if let Some(event) = &part.event {
                println!("  event:      {}", event);
            }
            for location in &part.locations {
                println!("  location:   {}", location);
            }
            if let Some(duration) = &part.duration {
                println!("  valid for:  {}", duration);
            }
            if let Some(stamp) = &part.timestamp {
                println!("  issued:     {}", stamp);
            }
            if let Some(callsign) = &part.callsign {
                println!("  from:       {}", callsign);
            }
        }
        Message::EndOfMessage => {
            println!("NNNN");
            if !quiet {
                println!("  (end of message)");
            }
        }
    }
}

fn parse_duration(text: &str) -> Result<(u8, u8), anyhow::Error> {
    let digits = text.strip_prefix('+').unwrap_or(text);
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        anyhow::bail!("--duration must be +HHMM, like +0030; got \"{}\"", text);
    }
    Ok((digits[0..2].parse()?, digits[2..4].parse()?))
}

fn parse_timestamp(text: &str) -> Result<(u16, u8, u8), anyhow::Error> {
    if text.len() != 7 || !text.bytes().all(|b| b.is_ascii_digit()) {
        anyhow::bail!("--timestamp must be JJJHHMM, like 3191423; got \"{}\"", text);
    }
    Ok((
        text[0..3].parse()?,
        text[3..5].parse()?,
        text[5..7].parse()?,
    ))
}

fn parse_originator(text: &str) -> Result<Originator, anyhow::Error> {
    let upper = text.to_ascii_uppercase();
    match Originator::from(upper.as_str()) {
        Originator::Unknown if upper != "OOO" => {
            anyhow::bail!("--originator must be one of PEP, CIV, WXR, EAS; got \"{}\"", text)
        }
        orig => Ok(orig),
    }
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("samecodec", log_filter)
            .filter_module("samewav", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }

    if !matches!(args.command, Command::Decode(_) | Command::Listen(_)) {
        return;
    }
    warn!("always test your decoding setup; never rely on a single alert path");
}
