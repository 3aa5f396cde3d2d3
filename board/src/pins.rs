use crate::event::Callback;
use chrono::{DateTime, Utc};
use kiddee_protocol::constants::{DIGITAL_PORT_COUNT, IGNORE};

/// Last known state of one input pin.
#[derive(Clone)]
pub(crate) struct PinData {
    pub(crate) value: u16,
    pub(crate) event_time: Option<DateTime<Utc>>,
    pub(crate) callback: Option<Callback>,
    /// Minimum change before an analog callback fires.
    pub(crate) differential: u16,
    pub(crate) pull_up: bool,
}

impl Default for PinData {
    fn default() -> Self {
        Self {
            value: 0,
            event_time: None,
            callback: None,
            differential: 1,
            pull_up: false,
        }
    }
}

impl std::fmt::Debug for PinData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinData")
            .field("value", &self.value)
            .field("event_time", &self.event_time)
            .field("callback", &self.callback.is_some())
            .field("differential", &self.differential)
            .field("pull_up", &self.pull_up)
            .finish()
    }
}

/// Digital and analog pin tables, indexed by pin number.
#[derive(Debug, Default)]
pub(crate) struct PinTables {
    pub(crate) digital: Vec<PinData>,
    pub(crate) analog: Vec<PinData>,
}

impl PinTables {
    /// Sizes the tables from an analog mapping response: one digital pin per
    /// entry, one analog pin per entry that is not `IGNORE`.
    pub(crate) fn from_analog_map(map: &[u8]) -> Self {
        let analog_count = map.iter().filter(|m| **m != IGNORE).count();
        Self {
            digital: vec![PinData::default(); map.len()],
            analog: vec![PinData::default(); analog_count],
        }
    }

    /// Digital pin number of analog pin A0.
    pub(crate) fn first_analog_pin(&self) -> usize {
        self.digital.len().saturating_sub(self.analog.len())
    }
}

/// Host-side copy of each digital output port, so a single pin can be
/// changed with a full port write.
#[derive(Debug, Default)]
pub(crate) struct PortShadow {
    ports: [u8; DIGITAL_PORT_COUNT],
}

impl PortShadow {
    /// Updates one pin and returns its port and the port's new mask.
    pub(crate) fn set(&mut self, pin: u8, high: bool) -> Option<(u8, u8)> {
        let port = (pin / 8) as usize;
        let bit = 1u8 << (pin % 8);
        let state = self.ports.get_mut(port)?;
        if high {
            *state |= bit;
        } else {
            *state &= !bit;
        }
        Some((port as u8, *state))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tables_from_uno_analog_map() {
        let mut map = vec![IGNORE; 14];
        map.extend(0..6);
        let tables = PinTables::from_analog_map(&map);
        assert_eq!(tables.digital.len(), 20);
        assert_eq!(tables.analog.len(), 6);
        assert_eq!(tables.first_analog_pin(), 14);
        assert_eq!(tables.analog[0].differential, 1);
    }

    #[test]
    fn port_shadow_tracks_each_port() {
        let mut shadow = PortShadow::default();
        assert_eq!(shadow.set(13, true), Some((1, 0b0010_0000)));
        assert_eq!(shadow.set(8, true), Some((1, 0b0010_0001)));
        assert_eq!(shadow.set(2, true), Some((0, 0b0000_0100)));
        assert_eq!(shadow.set(13, false), Some((1, 0b0000_0001)));
    }

    #[test]
    fn port_shadow_rejects_out_of_range() {
        let mut shadow = PortShadow::default();
        assert_eq!(shadow.set(128, true), None);
        assert_eq!(shadow.set(127, true), Some((15, 0b1000_0000)));
    }
}
