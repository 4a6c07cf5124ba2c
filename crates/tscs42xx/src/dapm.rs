//! Audio path power management.
//!
//! The codec's analog and digital blocks are modelled as a graph of widgets
//! joined by routes. A widget is powered when it sits on a complete path
//! from an active source (an enabled input endpoint or a running playback
//! stream) to an active sink (an enabled output endpoint or a running
//! capture stream), or when it has been force-enabled. Supplies are powered
//! whenever anything they feed is powered.
//!
//! [`Dapm::sync`](PowerDomain::sync) recomputes the powered set and writes
//! the changed power bits in sequence: supplies first on power-up and last
//! on power-down, with each widget's settle delay honoured after power-up
//! and before power-down.

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use crate::registers::{
    RM_CNVRTR0_HPOR, RM_DMICCTL_DMICEN, RM_INSEL, RM_PWRM1_ADCL, RM_PWRM1_ADCR, RM_PWRM1_BSTL,
    RM_PWRM1_BSTR, RM_PWRM1_MICB, RM_PWRM1_PGAL, RM_PWRM1_PGAR, RM_PWRM2_HPL, RM_PWRM2_HPR,
    RM_PWRM2_INSELL, RM_PWRM2_INSELR, RM_PWRM2_SPKL, RM_PWRM2_SPKR, RM_PWRM2_VREF, R_CNVRTR0,
    R_DMICCTL, R_INSELL, R_INSELR, R_PWRM1, R_PWRM2,
};
use crate::regmap::RegisterIo;

/// Maximum widgets in one graph (codec plus board).
pub const MAX_WIDGETS: usize = 48;
/// Maximum routes in one graph.
pub const MAX_ROUTES: usize = 64;

/// Name of the widget that gates coefficient RAM access.
pub const DAC_L: &str = "DAC L";

/// Widget category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WidgetKind {
    /// Codec input pin.
    Input,
    /// Codec output pin.
    Output,
    /// Power supply for other widgets.
    Supply,
    /// Playback converter.
    Dac,
    /// Capture converter.
    Adc,
    /// Gain stage.
    Pga,
    /// Input selector.
    Mux,
    /// Board microphone.
    Mic,
    /// Board line input.
    Line,
    /// Board headphone jack.
    Headphone,
    /// Board speaker.
    Speaker,
}

impl WidgetKind {
    const fn is_source_endpoint(self) -> bool {
        matches!(self, Self::Input | Self::Mic | Self::Line)
    }

    const fn is_sink_endpoint(self) -> bool {
        matches!(self, Self::Output | Self::Headphone | Self::Speaker)
    }
}

/// PCM stream direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stream {
    /// Playback (DAC side).
    Playback,
    /// Capture (ADC side).
    Capture,
}

/// Register bit that powers a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerBit {
    /// Register address.
    pub reg: u8,
    /// Bit mask.
    pub mask: u8,
    /// Bit is cleared to power the widget on.
    pub invert: bool,
}

/// Enumerated register field selecting a mux input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxControl {
    /// Register address.
    pub reg: u8,
    /// Field mask.
    pub mask: u8,
    /// Field position.
    pub shift: u8,
    /// Route label for each field value.
    pub texts: &'static [&'static str],
}

impl MuxControl {
    /// Label currently selected by register value `value`.
    pub fn selected(&self, value: u8) -> Option<&'static str> {
        let index = (value & self.mask).checked_shr(u32::from(self.shift))?;
        self.texts.get(usize::from(index)).copied()
    }
}

/// One node of the power graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Widget {
    /// Unique name.
    pub name: &'static str,
    /// Category.
    pub kind: WidgetKind,
    /// Power control bit, if any.
    pub power: Option<PowerBit>,
    /// Stream that activates a converter.
    pub stream: Option<Stream>,
    /// Selector for mux widgets.
    pub mux: Option<MuxControl>,
    /// Supply ordering; lower powers up first.
    pub seq: u8,
    /// Settle time after power-up and before power-down.
    pub settle_ms: u32,
}

impl Widget {
    const fn base(name: &'static str, kind: WidgetKind) -> Self {
        Self {
            name,
            kind,
            power: None,
            stream: None,
            mux: None,
            seq: 0,
            settle_ms: 0,
        }
    }

    const fn bit(reg: u8, mask: u8, invert: bool) -> Option<PowerBit> {
        Some(PowerBit { reg, mask, invert })
    }

    /// Codec input pin.
    pub const fn input(name: &'static str) -> Self {
        Self::base(name, WidgetKind::Input)
    }

    /// Codec output pin.
    pub const fn output(name: &'static str) -> Self {
        Self::base(name, WidgetKind::Output)
    }

    /// Sequenced supply.
    pub const fn supply(name: &'static str, reg: u8, mask: u8, seq: u8, settle_ms: u32) -> Self {
        let mut w = Self::base(name, WidgetKind::Supply);
        w.power = Self::bit(reg, mask, false);
        w.seq = seq;
        w.settle_ms = settle_ms;
        w
    }

    /// Playback converter.
    pub const fn dac(name: &'static str, reg: u8, mask: u8) -> Self {
        let mut w = Self::base(name, WidgetKind::Dac);
        w.power = Self::bit(reg, mask, false);
        w.stream = Some(Stream::Playback);
        w
    }

    /// Capture converter.
    pub const fn adc(name: &'static str, reg: u8, mask: u8) -> Self {
        let mut w = Self::base(name, WidgetKind::Adc);
        w.power = Self::bit(reg, mask, false);
        w.stream = Some(Stream::Capture);
        w
    }

    /// Gain stage.
    pub const fn pga(name: &'static str, reg: u8, mask: u8, invert: bool) -> Self {
        let mut w = Self::base(name, WidgetKind::Pga);
        w.power = Self::bit(reg, mask, invert);
        w
    }

    /// Input selector.
    pub const fn mux(name: &'static str, reg: u8, mask: u8, control: MuxControl) -> Self {
        let mut w = Self::base(name, WidgetKind::Mux);
        w.power = Self::bit(reg, mask, false);
        w.mux = Some(control);
        w
    }

    /// Board microphone.
    pub const fn mic(name: &'static str) -> Self {
        Self::base(name, WidgetKind::Mic)
    }

    /// Board line input.
    pub const fn line(name: &'static str) -> Self {
        Self::base(name, WidgetKind::Line)
    }

    /// Board headphone jack.
    pub const fn headphone(name: &'static str) -> Self {
        Self::base(name, WidgetKind::Headphone)
    }

    /// Board speaker.
    pub const fn speaker(name: &'static str) -> Self {
        Self::base(name, WidgetKind::Speaker)
    }
}

/// Directed connection `source -> sink`, optionally gated by a mux label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Downstream widget.
    pub sink: &'static str,
    /// Mux label that must be selected on `sink`.
    pub control: Option<&'static str>,
    /// Upstream widget.
    pub source: &'static str,
}

/// Unconditional route.
pub const fn route(sink: &'static str, source: &'static str) -> Route {
    Route {
        sink,
        control: None,
        source,
    }
}

/// Route that exists only while mux `sink` selects `control`.
pub const fn via(sink: &'static str, control: &'static str, source: &'static str) -> Route {
    Route {
        sink,
        control: Some(control),
        source,
    }
}

/// Input selector labels, in field order.
pub const INPUT_SELECT_TEXTS: &[&str] = &["Line 1", "Line 2", "Line 3", "D2S"];

const LEFT_INPUT_SELECT: MuxControl = MuxControl {
    reg: R_INSELL,
    mask: RM_INSEL,
    shift: 6,
    texts: INPUT_SELECT_TEXTS,
};

const RIGHT_INPUT_SELECT: MuxControl = MuxControl {
    reg: R_INSELR,
    mask: RM_INSEL,
    shift: 6,
    texts: INPUT_SELECT_TEXTS,
};

/// Codec widgets.
pub const CODEC_WIDGETS: [Widget; 28] = [
    Widget::supply("Vref", R_PWRM2, RM_PWRM2_VREF, 1, 5),
    Widget::dac(DAC_L, R_PWRM2, RM_PWRM2_HPL),
    Widget::dac("DAC R", R_PWRM2, RM_PWRM2_HPR),
    Widget::output("Headphone L"),
    Widget::output("Headphone R"),
    Widget::dac("ClassD L", R_PWRM2, RM_PWRM2_SPKL),
    Widget::dac("ClassD R", R_PWRM2, RM_PWRM2_SPKR),
    Widget::output("Speaker L"),
    Widget::output("Speaker R"),
    Widget::pga("Analog In PGA L", R_PWRM1, RM_PWRM1_PGAL, false),
    Widget::pga("Analog In PGA R", R_PWRM1, RM_PWRM1_PGAR, false),
    Widget::pga("Analog Boost L", R_PWRM1, RM_PWRM1_BSTL, false),
    Widget::pga("Analog Boost R", R_PWRM1, RM_PWRM1_BSTR, false),
    Widget::pga("ADC Mute", R_CNVRTR0, RM_CNVRTR0_HPOR, true),
    Widget::adc("ADC L", R_PWRM1, RM_PWRM1_ADCL),
    Widget::adc("ADC R", R_PWRM1, RM_PWRM1_ADCR),
    Widget::mux("Input L Capture Route", R_PWRM2, RM_PWRM2_INSELL, LEFT_INPUT_SELECT),
    Widget::mux("Input R Capture Route", R_PWRM2, RM_PWRM2_INSELR, RIGHT_INPUT_SELECT),
    Widget::supply("Digital Mic Enable", R_DMICCTL, RM_DMICCTL_DMICEN, 2, 0),
    Widget::input("Digital Mic L"),
    Widget::input("Digital Mic R"),
    Widget::supply("Mic Bias", R_PWRM1, RM_PWRM1_MICB, 2, 5),
    Widget::input("Line In 1 L"),
    Widget::input("Line In 1 R"),
    Widget::input("Line In 2 L"),
    Widget::input("Line In 2 R"),
    Widget::input("Line In 3 L"),
    Widget::input("Line In 3 R"),
];

/// Codec interconnect.
pub const CODEC_ROUTES: [Route; 25] = [
    route(DAC_L, "Vref"),
    route("DAC R", "Vref"),
    route("Headphone L", DAC_L),
    route("Headphone R", "DAC R"),
    route("ClassD L", "Vref"),
    route("ClassD R", "Vref"),
    route("Speaker L", "ClassD L"),
    route("Speaker R", "ClassD R"),
    route("Input L Capture Route", "Vref"),
    route("Input R Capture Route", "Vref"),
    route("Mic Bias", "Vref"),
    via("Input L Capture Route", "Line 1", "Line In 1 L"),
    via("Input R Capture Route", "Line 1", "Line In 1 R"),
    via("Input L Capture Route", "Line 2", "Line In 2 L"),
    via("Input R Capture Route", "Line 2", "Line In 2 R"),
    via("Input L Capture Route", "Line 3", "Line In 3 L"),
    via("Input R Capture Route", "Line 3", "Line In 3 R"),
    route("Analog In PGA L", "Input L Capture Route"),
    route("Analog In PGA R", "Input R Capture Route"),
    route("Analog Boost L", "Analog In PGA L"),
    route("Analog Boost R", "Analog In PGA R"),
    route("ADC Mute", "Analog Boost L"),
    route("ADC Mute", "Analog Boost R"),
    route("ADC L", "ADC Mute"),
    route("ADC R", "ADC Mute"),
];

/// Graph construction or pin lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DapmError {
    /// No widget with that name.
    UnknownWidget,
    /// A widget with that name already exists.
    DuplicateWidget,
    /// Widget capacity exhausted.
    TooManyWidgets,
    /// Route capacity exhausted.
    TooManyRoutes,
}

impl core::fmt::Display for DapmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownWidget => write!(f, "unknown widget"),
            Self::DuplicateWidget => write!(f, "duplicate widget"),
            Self::TooManyWidgets => write!(f, "too many widgets"),
            Self::TooManyRoutes => write!(f, "too many routes"),
        }
    }
}

/// Pin and power control used by the codec core.
pub trait PowerDomain {
    /// Allow `name` to be powered when on a complete path.
    fn enable_pin(&mut self, name: &str) -> Result<(), DapmError>;
    /// Keep `name` off regardless of paths. Clears a force-enable.
    fn disable_pin(&mut self, name: &str) -> Result<(), DapmError>;
    /// Power `name` regardless of paths.
    fn force_enable_pin(&mut self, name: &str) -> Result<(), DapmError>;
    /// Mark a PCM stream as running or stopped.
    fn set_stream_active(&mut self, stream: Stream, active: bool);
    /// Forget which widgets are powered, e.g. after a chip reset.
    fn mark_unpowered(&mut self);
    /// Bring the hardware in line with the current pin and stream state.
    fn sync<R, D>(&mut self, regs: &mut R, delay: &mut D) -> Result<(), R::Error>
    where
        R: RegisterIo + ?Sized,
        D: DelayNs + ?Sized;
}

#[derive(Debug, Clone, Copy)]
struct Node {
    widget: Widget,
    enabled: bool,
    forced: bool,
    powered: bool,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    source: usize,
    sink: usize,
    label: Option<&'static str>,
}

type Flags = [bool; MAX_WIDGETS];

fn flag(flags: &Flags, i: usize) -> bool {
    flags.get(i).copied().unwrap_or(false)
}

fn set_flag(flags: &mut Flags, i: usize) -> bool {
    match flags.get_mut(i) {
        Some(f) if !*f => {
            *f = true;
            true
        }
        _ => false,
    }
}

/// Widget graph with pin and stream state.
#[derive(Debug, Clone)]
pub struct Dapm {
    nodes: Vec<Node, MAX_WIDGETS>,
    edges: Vec<Edge, MAX_ROUTES>,
    playback: bool,
    capture: bool,
}

impl Default for Dapm {
    fn default() -> Self {
        Self::new()
    }
}

impl Dapm {
    /// Empty graph.
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            playback: false,
            capture: false,
        }
    }

    /// Graph holding the codec's own widgets and routes.
    pub fn for_codec() -> Result<Self, DapmError> {
        let mut dapm = Self::new();
        dapm.add_widgets(&CODEC_WIDGETS)?;
        dapm.add_routes(&CODEC_ROUTES)?;
        Ok(dapm)
    }

    /// Add widgets. Every widget starts enabled and unpowered.
    pub fn add_widgets(&mut self, widgets: &[Widget]) -> Result<(), DapmError> {
        for w in widgets {
            if self.find(w.name).is_some() {
                return Err(DapmError::DuplicateWidget);
            }
            self.nodes
                .push(Node {
                    widget: *w,
                    enabled: true,
                    forced: false,
                    powered: false,
                })
                .map_err(|_| DapmError::TooManyWidgets)?;
        }
        Ok(())
    }

    /// Add routes between existing widgets.
    pub fn add_routes(&mut self, routes: &[Route]) -> Result<(), DapmError> {
        for r in routes {
            let source = self.find(r.source).ok_or(DapmError::UnknownWidget)?;
            let sink = self.find(r.sink).ok_or(DapmError::UnknownWidget)?;
            self.edges
                .push(Edge {
                    source,
                    sink,
                    label: r.control,
                })
                .map_err(|_| DapmError::TooManyRoutes)?;
        }
        Ok(())
    }

    /// Power state as of the last sync.
    pub fn is_powered(&self, name: &str) -> Option<bool> {
        self.node(name).map(|n| n.powered)
    }

    /// Whether `name` is enabled (forced or not).
    pub fn pin_status(&self, name: &str) -> Option<bool> {
        self.node(name).map(|n| n.enabled)
    }

    /// Whether `name` is force-enabled.
    pub fn is_forced(&self, name: &str) -> Option<bool> {
        self.node(name).map(|n| n.forced)
    }

    /// Whether `stream` is marked running.
    pub fn stream_active(&self, stream: Stream) -> bool {
        match stream {
            Stream::Playback => self.playback,
            Stream::Capture => self.capture,
        }
    }

    /// Number of widgets in the graph.
    pub fn widget_count(&self) -> usize {
        self.nodes.len()
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.widget.name == name)
    }

    fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.widget.name == name)
    }

    fn node_mut(&mut self, name: &str) -> Result<&mut Node, DapmError> {
        self.nodes
            .iter_mut()
            .find(|n| n.widget.name == name)
            .ok_or(DapmError::UnknownWidget)
    }

    fn kind(&self, i: usize) -> Option<WidgetKind> {
        self.nodes.get(i).map(|n| n.widget.kind)
    }

    fn is_supply(&self, i: usize) -> bool {
        self.kind(i) == Some(WidgetKind::Supply)
    }

    fn enabled(&self, i: usize) -> bool {
        self.nodes.get(i).is_some_and(|n| n.enabled)
    }

    fn connected(&self, edge: &Edge, selected: &[Option<&'static str>; MAX_WIDGETS]) -> bool {
        match edge.label {
            None => true,
            Some(label) => match self.nodes.get(edge.sink).and_then(|n| n.widget.mux) {
                Some(_) => selected.get(edge.sink).copied().flatten() == Some(label),
                None => true,
            },
        }
    }

    /// Powered set for the given mux selections.
    fn solve(&self, selected: &[Option<&'static str>; MAX_WIDGETS]) -> Flags {
        let mut src: Flags = [false; MAX_WIDGETS];
        let mut snk: Flags = [false; MAX_WIDGETS];

        for (i, n) in self.nodes.iter().enumerate() {
            if !n.enabled {
                continue;
            }
            let k = n.widget.kind;
            let stream_on = n.widget.stream.is_some_and(|s| self.stream_active(s));
            let has_inputs = self
                .edges
                .iter()
                .any(|e| e.sink == i && !self.is_supply(e.source));
            let has_outputs = self.edges.iter().any(|e| e.source == i);
            if (k.is_source_endpoint() && !has_inputs) || (k == WidgetKind::Dac && stream_on) {
                set_flag(&mut src, i);
            }
            if (k.is_sink_endpoint() && !has_outputs) || (k == WidgetKind::Adc && stream_on) {
                set_flag(&mut snk, i);
            }
        }

        for _ in 0..=self.nodes.len() {
            let mut changed = false;
            for e in &self.edges {
                if self.is_supply(e.source) || !self.connected(e, selected) {
                    continue;
                }
                if flag(&src, e.source) && self.enabled(e.sink) {
                    changed |= set_flag(&mut src, e.sink);
                }
                if flag(&snk, e.sink) && self.enabled(e.source) {
                    changed |= set_flag(&mut snk, e.source);
                }
            }
            if !changed {
                break;
            }
        }

        let mut powered: Flags = [false; MAX_WIDGETS];
        for (i, n) in self.nodes.iter().enumerate() {
            let on_path =
                n.enabled && !self.is_supply(i) && flag(&src, i) && flag(&snk, i);
            if n.forced || on_path {
                set_flag(&mut powered, i);
            }
        }

        for _ in 0..=self.nodes.len() {
            let mut changed = false;
            for e in &self.edges {
                if self.is_supply(e.source) && flag(&powered, e.sink) && self.enabled(e.source) {
                    changed |= set_flag(&mut powered, e.source);
                }
            }
            if !changed {
                break;
            }
        }
        powered
    }

    /// Read every mux selector from the device.
    fn read_selections<R>(&self, regs: &mut R) -> Result<[Option<&'static str>; MAX_WIDGETS], R::Error>
    where
        R: RegisterIo + ?Sized,
    {
        let mut selected = [None; MAX_WIDGETS];
        for (n, slot) in self.nodes.iter().zip(selected.iter_mut()) {
            if let Some(mux) = n.widget.mux {
                *slot = mux.selected(regs.read(mux.reg)?);
            }
        }
        Ok(selected)
    }

    fn apply<R, D>(&mut self, i: usize, on: bool, regs: &mut R, delay: &mut D) -> Result<(), R::Error>
    where
        R: RegisterIo + ?Sized,
        D: DelayNs + ?Sized,
    {
        let Some(node) = self.nodes.get_mut(i) else {
            return Ok(());
        };
        let w = node.widget;
        if let Some(bit) = w.power {
            if !on && w.settle_ms > 0 {
                delay.delay_ms(w.settle_ms);
            }
            let value = if on != bit.invert { bit.mask } else { 0 };
            regs.update_bits(bit.reg, bit.mask, value)?;
            if on && w.settle_ms > 0 {
                delay.delay_ms(w.settle_ms);
            }
            debug!("tscs42xx: {} {}", w.name, if on { "on" } else { "off" });
        }
        node.powered = on;
        Ok(())
    }
}

impl PowerDomain for Dapm {
    fn enable_pin(&mut self, name: &str) -> Result<(), DapmError> {
        let n = self.node_mut(name)?;
        n.enabled = true;
        n.forced = false;
        Ok(())
    }

    fn disable_pin(&mut self, name: &str) -> Result<(), DapmError> {
        let n = self.node_mut(name)?;
        n.enabled = false;
        n.forced = false;
        Ok(())
    }

    fn force_enable_pin(&mut self, name: &str) -> Result<(), DapmError> {
        let n = self.node_mut(name)?;
        n.enabled = true;
        n.forced = true;
        Ok(())
    }

    fn mark_unpowered(&mut self) {
        for n in &mut self.nodes {
            n.powered = false;
        }
    }

    fn set_stream_active(&mut self, stream: Stream, active: bool) {
        match stream {
            Stream::Playback => self.playback = active,
            Stream::Capture => self.capture = active,
        }
    }

    fn sync<R, D>(&mut self, regs: &mut R, delay: &mut D) -> Result<(), R::Error>
    where
        R: RegisterIo + ?Sized,
        D: DelayNs + ?Sized,
    {
        let selected = self.read_selections(regs)?;
        let target = self.solve(&selected);

        let mut down: Vec<(u8, u8, usize), MAX_WIDGETS> = Vec::new();
        let mut up: Vec<(u8, u8, usize), MAX_WIDGETS> = Vec::new();
        for (i, n) in self.nodes.iter().enumerate() {
            let want = flag(&target, i);
            if want == n.powered {
                continue;
            }
            let supply = n.widget.kind == WidgetKind::Supply;
            // Capacity equals MAX_WIDGETS, so pushes cannot fail.
            if want {
                let _ = up.push((u8::from(!supply), n.widget.seq, i));
            } else {
                let _ = down.push((u8::from(supply), u8::MAX.saturating_sub(n.widget.seq), i));
            }
        }
        down.sort_unstable();
        up.sort_unstable();

        for &(_, _, i) in &down {
            self.apply(i, false, regs, delay)?;
        }
        for &(_, _, i) in &up {
            self.apply(i, true, regs, delay)?;
        }
        Ok(())
    }
}
