use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};

use stillwave::{AudioEngine, AudioOutput, PlaybackSync, Settings, SoundId};

#[derive(Parser)]
#[command(name = "stillwave")]
#[command(about = "Ambient soundscape mixer with a sleep timer")]
struct Args {
    /// List available audio output devices and exit
    #[arg(short, long)]
    list_devices: bool,

    /// Output device name (substring match)
    #[arg(short, long)]
    device: Option<String>,

    /// Sounds to start immediately (rain, ocean, forest, campfire, wind, cafe, night)
    #[arg(short, long)]
    sound: Vec<String>,

    /// Sleep timer in minutes
    #[arg(short, long)]
    timer: Option<f32>,

    /// Restore the mix that was playing when the app last quit
    #[arg(long)]
    restore: bool,

    /// Play without the interactive mixer (Ctrl+C to stop)
    #[arg(long)]
    non_interactive: bool,
}

fn list_audio_devices(host: &Host) -> Result<()> {
    println!("Available audio devices:");
    let default_output = host.default_output_device();
    if let Some(device) = &default_output {
        println!("  * {} (default)", device.name()?);
    }
    for device in host.output_devices()? {
        let name = device.name()?;
        let is_default = default_output
            .as_ref()
            .map(|d| d.name().unwrap_or_default() == name)
            .unwrap_or(false);
        if !is_default {
            println!("    {}", name);
        }
    }
    Ok(())
}

fn find_device_by_name(host: &Host, device_name: &str) -> Result<Device> {
    for device in host.output_devices()? {
        if device
            .name()?
            .to_lowercase()
            .contains(&device_name.to_lowercase())
        {
            return Ok(device);
        }
    }
    anyhow::bail!("Device '{}' not found", device_name);
}

struct Mixer {
    sync: PlaybackSync,
    selected: usize,
}

// Rows 0..ALL.len() are sounds, the last row is the sleep timer.
const TIMER_ROW: usize = SoundId::ALL.len();

impl Mixer {
    fn new(sync: PlaybackSync) -> Self {
        Self { sync, selected: 0 }
    }

    fn draw_bar(&self, y: u16, name: &str, value: f32, active: bool, selected: bool) -> Result<()> {
        let mut stdout = io::stdout();
        queue!(stdout, cursor::MoveTo(2, y))?;
        if selected {
            queue!(stdout, SetForegroundColor(Color::Yellow), Print("► "))?;
        } else {
            queue!(stdout, SetForegroundColor(Color::White), Print("  "))?;
        }
        let marker = if active { "●" } else { "○" };
        queue!(stdout, Print(format!("{} {:<15}", marker, name)))?;

        let bar_width = 24;
        let filled = (value * bar_width as f32) as usize;
        queue!(stdout, Print("["))?;
        queue!(stdout, SetForegroundColor(Color::Green))?;
        for _ in 0..filled {
            queue!(stdout, Print("█"))?;
        }
        queue!(stdout, SetForegroundColor(Color::DarkGrey))?;
        for _ in filled..bar_width {
            queue!(stdout, Print("░"))?;
        }
        queue!(stdout, SetForegroundColor(Color::White))?;
        queue!(stdout, Print(format!("] {:3.0}%", value * 100.0)))?;
        queue!(stdout, ResetColor)?;
        Ok(())
    }

    fn draw(&self) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        queue!(stdout, SetForegroundColor(Color::Cyan))?;
        queue!(stdout, Print("stillwave — ambient mixer\n\r"))?;
        queue!(stdout, ResetColor)?;
        queue!(
            stdout,
            Print("↑/↓ select, ←/→ adjust, space toggle, a stop all, q quit\n\r")
        )?;

        let store = self.sync.store();
        for (i, id) in SoundId::ALL.iter().enumerate() {
            let active = store.active.contains(id);
            self.draw_bar(
                3 + i as u16,
                id.label(),
                store.volume(*id),
                active,
                self.selected == i,
            )?;
        }

        let timer_y = 4 + SoundId::ALL.len() as u16;
        queue!(stdout, cursor::MoveTo(2, timer_y))?;
        let prefix = if self.selected == TIMER_ROW { "► " } else { "  " };
        if let Some(secs) = self.sync.timer_remaining_secs() {
            queue!(
                stdout,
                Print(format!(
                    "{}Sleep timer: {:.0}:{:02.0} remaining",
                    prefix,
                    (secs / 60.0).floor(),
                    secs % 60.0
                ))
            )?;
        } else if store.timer_minutes > 0.0 {
            queue!(
                stdout,
                Print(format!(
                    "{}Sleep timer: {:.0} min (starts with playback)",
                    prefix, store.timer_minutes
                ))
            )?;
        } else {
            queue!(stdout, Print(format!("{}Sleep timer: off", prefix)))?;
        }

        stdout.flush()?;
        Ok(())
    }

    /// Returns true when the mixer should exit.
    fn handle_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected < TIMER_ROW {
                    self.selected += 1;
                }
            }
            KeyCode::Left | KeyCode::Right => {
                let step = if key == KeyCode::Left { -1.0 } else { 1.0 };
                if self.selected == TIMER_ROW {
                    let minutes = (self.sync.store().timer_minutes + step * 5.0).max(0.0);
                    self.sync.set_timer_minutes(minutes);
                } else {
                    let id = SoundId::ALL[self.selected];
                    let volume = self.sync.store().volume(id) + step * 0.05;
                    self.sync.set_sound_volume(id, volume);
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if self.selected < TIMER_ROW {
                    self.sync.toggle_sound(SoundId::ALL[self.selected]);
                }
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                self.sync.stop_all();
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return true,
            _ => {}
        }
        false
    }

    fn run(&mut self) -> Result<()> {
        execute!(io::stdout(), EnterAlternateScreen)?;
        terminal::enable_raw_mode()?;
        let result = self.run_loop();
        terminal::disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;
        result
    }

    fn run_loop(&mut self) -> Result<()> {
        loop {
            self.sync.poll_events();
            self.draw()?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key_event) = event::read()? {
                    if key_event.modifiers.contains(KeyModifiers::CONTROL)
                        && key_event.code == KeyCode::Char('c')
                    {
                        break;
                    }
                    if self.handle_key(key_event.code) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let host = cpal::default_host();
    if args.list_devices {
        return list_audio_devices(&host);
    }

    let device = if let Some(name) = &args.device {
        find_device_by_name(&host, name)?
    } else {
        host.default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default output device available"))?
    };
    log::info!("using output device {}", device.name()?);

    let settings = Settings::load();

    let engine = Arc::new(Mutex::new(AudioEngine::default()));
    let _output = AudioOutput::on_device(&device, Arc::clone(&engine))?;

    let mut sync = PlaybackSync::new(Arc::clone(&engine));
    for (&id, &volume) in &settings.volumes {
        sync.set_sound_volume(id, volume);
    }

    let timer = args.timer.unwrap_or(settings.timer_minutes);
    if timer > 0.0 {
        sync.set_timer_minutes(timer);
    }

    let mut startup: Vec<SoundId> = Vec::new();
    for key in &args.sound {
        match SoundId::from_key(key) {
            Some(id) => startup.push(id),
            None => anyhow::bail!(
                "Unknown sound '{}'. Valid sounds: {}",
                key,
                SoundId::ALL.map(|id| id.key()).join(", ")
            ),
        }
    }
    if args.restore && startup.is_empty() {
        startup = settings.last_mix.clone();
    }
    for id in startup {
        if !sync.store().active.contains(&id) {
            sync.toggle_sound(id);
        }
    }

    if args.non_interactive {
        println!("Playing... press Ctrl+C to stop");
        loop {
            sync.poll_events();
            if sync.store().active.is_empty() && sync.timer_remaining_secs().is_none() {
                // Timer ran out (or nothing was ever started)
                break;
            }
            std::thread::sleep(Duration::from_millis(200));
        }
    } else {
        let mut mixer = Mixer::new(sync);
        mixer.run()?;
        sync = mixer.sync;
    }

    let mut settings = settings;
    for (&id, &volume) in &sync.store().volumes {
        settings.volumes.insert(id, volume);
    }
    settings.last_mix = sync.store().active.clone();
    if let Err(e) = settings.save() {
        log::warn!("could not save settings: {}", e);
    }

    sync.stop_all();
    Ok(())
}
