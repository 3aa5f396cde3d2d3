use crate::{
    event::{Callback, Event},
    query::PinState,
    state::{lock, Shared},
};
use chrono::{TimeDelta, Utc};
use kiddee_protocol::{
    constants::{sysex, ANALOG_MESSAGE, DIGITAL_MESSAGE, REPORT_VERSION},
    frame::FrameDecoder,
    report::Report,
};
use log::{debug, info, trace, warn};
use std::{collections::HashMap, sync::Arc};
use tokio::{
    sync::{mpsc::UnboundedReceiver, watch},
    task::JoinHandle,
};

type Handler = fn(&Shared, Report);

/// Handlers keyed by the frame's command byte (or sysex ID).
pub(crate) fn dispatch_table() -> HashMap<u8, Handler> {
    HashMap::from([
        (REPORT_VERSION, report_version as Handler),
        (sysex::REPORT_FIRMWARE, report_firmware),
        (ANALOG_MESSAGE, analog_message),
        (DIGITAL_MESSAGE, digital_message),
        (sysex::SONAR_DATA, sonar_data),
        (sysex::STRING_DATA, string_data),
        (sysex::I2C_REPLY, i2c_reply),
        (sysex::CAPABILITY_RESPONSE, capability_response),
        (sysex::PIN_STATE_RESPONSE, pin_state_response),
        (sysex::ANALOG_MAPPING_RESPONSE, analog_mapping_response),
        (sysex::DHT_DATA, dht_data),
        (sysex::PM25_DATA, pm25_data),
        (sysex::IR_DATA, ir_data),
    ])
}

/// Drains the receive FIFO, frames the bytes and dispatches each report.
pub(crate) fn spawn(
    shared: Arc<Shared>,
    mut rx: UnboundedReceiver<u8>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let table = dispatch_table();
        let mut decoder = FrameDecoder::new();

        loop {
            let byte = tokio::select! {
                byte = rx.recv() => match byte {
                    Some(byte) => byte,
                    None => {
                        debug!("Receive queue closed, reporter exiting");
                        break;
                    }
                },
                _ = shutdown.wait_for(|stop| *stop) => {
                    debug!("Reporter stopping");
                    break;
                }
            };

            if let Some(frame) = decoder.push(byte) {
                let command = frame.command();
                let Some(handler) = table.get(&command) else {
                    warn!("No handler for command {command:#04x}, skipping");
                    continue;
                };

                match Report::decode(&frame) {
                    Ok(report) => {
                        trace!("Report: {report:?}");
                        handler(&shared, report);
                    }
                    Err(e) => warn!("Failed to decode {command:#04x}: {e}"),
                }
            }
        }
    })
}

fn notify(callback: Option<Callback>, event: Event) {
    if let Some(callback) = callback {
        callback(event);
    }
}

fn report_version(shared: &Shared, report: Report) {
    if let Report::ProtocolVersion(version) = report {
        shared.replies.version.set(version);
    }
}

fn report_firmware(shared: &Shared, report: Report) {
    if let Report::Firmware(firmware) = report {
        shared.replies.firmware.set(firmware);
    }
}

fn analog_mapping_response(shared: &Shared, report: Report) {
    if let Report::AnalogMap(map) = report {
        shared.replies.analog_map.set(map);
    }
}

fn capability_response(shared: &Shared, report: Report) {
    if let Report::Capabilities(capabilities) = report {
        shared.replies.capabilities.set(capabilities);
    }
}

fn pin_state_response(shared: &Shared, report: Report) {
    if let Report::PinState { pin, mode, state } = report {
        shared
            .replies
            .pin_state
            .set(PinState { pin, mode, state });
    }
}

fn analog_message(shared: &Shared, report: Report) {
    let Report::AnalogValue { pin, value } = report else {
        return;
    };

    let callback = {
        let mut pins = lock(&shared.pins);
        let Some(data) = pins.analog.get_mut(pin as usize) else {
            warn!("Analog report for unknown pin A{pin}");
            return;
        };
        if value.abs_diff(data.value) < data.differential {
            return;
        }
        data.value = value;
        data.event_time = Some(Utc::now());
        data.callback.clone().zip(data.event_time)
    };

    if let Some((callback, time)) = callback {
        callback(Event::Analog { pin, value, time });
    }
}

fn digital_message(shared: &Shared, report: Report) {
    let Report::DigitalPort { port, mask } = report else {
        return;
    };

    let mut events = Vec::new();
    {
        let mut pins = lock(&shared.pins);
        let first = port as usize * 8;
        let last = (first + 8).min(pins.digital.len());
        let time = Utc::now();

        for (bit, pin) in (first..last).enumerate() {
            let value = ((mask >> bit) & 0x01) as u16;
            let data = &mut pins.digital[pin];
            let previous = data.value;
            data.value = value;
            data.event_time = Some(time);

            if previous != value {
                if let Some(callback) = data.callback.clone() {
                    let (pin, value) = (pin as u8, value as u8);
                    let event = if data.pull_up {
                        Event::Pullup { pin, value, time }
                    } else {
                        Event::Input { pin, value, time }
                    };
                    events.push((callback, event));
                }
            }
        }
    }

    for (callback, event) in events {
        callback(event);
    }
}

fn i2c_reply(shared: &Shared, report: Report) {
    let Report::I2cReply {
        address,
        register,
        data,
    } = report
    else {
        return;
    };

    let callback = {
        let mut map = lock(&shared.i2c);
        let Some(entry) = map.get_mut(&address) else {
            debug!("Ignoring I2C reply from unregistered address {address:#04x}");
            return;
        };
        entry.register = register;
        entry.data = Some(data.clone());
        entry.time = Some(Utc::now());
        entry.callback.clone().zip(entry.time)
    };

    if let Some((callback, time)) = callback {
        callback(Event::I2c {
            address,
            register,
            data,
            time,
        });
    }
}

fn sonar_data(shared: &Shared, report: Report) {
    let Report::Sonar {
        trigger_pin,
        distance_cm,
    } = report
    else {
        return;
    };

    let callback = {
        let mut map = lock(&shared.sonar);
        let Some(entry) = map.get_mut(&trigger_pin) else {
            warn!("Sonar data for unconfigured trigger pin {trigger_pin}");
            return;
        };

        match entry.callback.clone() {
            Some(callback) => {
                if entry.distance_cm == distance_cm {
                    return;
                }
                entry.distance_cm = distance_cm;
                entry.time = Some(Utc::now());
                (distance_cm != 0).then_some(callback).zip(entry.time)
            }
            None => {
                entry.distance_cm = distance_cm;
                entry.time = Some(Utc::now());
                None
            }
        }
    };

    if let Some((callback, time)) = callback {
        callback(Event::Sonar {
            trigger_pin,
            distance_cm,
            time,
        });
    }
}

fn string_data(_shared: &Shared, report: Report) {
    if let Report::StringData(message) = report {
        info!("Board says: {message}");
    }
}

fn dht_data(shared: &Shared, report: Report) {
    let Report::Dht {
        pin,
        sensor_type,
        reading,
    } = report
    else {
        return;
    };

    let callback = {
        let mut map = lock(&shared.dht);
        let Some(entry) = map.get_mut(&pin) else {
            warn!("DHT data for unconfigured pin {pin}");
            return;
        };

        let time = Utc::now();
        entry.time = Some(time);

        let Some(reading) = reading else {
            return;
        };
        if reading.is_error() {
            warn!("DHT sensor on pin {pin} reported {reading:?}");
        }

        let (last_humidity, last_temperature) = entry.reading.values();
        let (humidity, temperature) = reading.values();
        entry.reading = reading;

        let changed = if last_humidity != humidity {
            (humidity - last_humidity).abs() >= entry.differential
        } else if last_temperature != temperature {
            (temperature - last_temperature).abs() >= entry.differential
        } else {
            false
        };

        changed
            .then(|| entry.callback.clone())
            .flatten()
            .map(|cb| (cb, reading, time))
    };

    if let Some((callback, reading, time)) = callback {
        callback(Event::Dht {
            pin,
            sensor_type,
            reading,
            time,
        });
    }
}

fn pm25_data(shared: &Shared, report: Report) {
    let Report::Pm25 { pm25, pm10, error } = report else {
        return;
    };

    let (callback, event) = {
        let mut entry = lock(&shared.pm25);
        let time = Utc::now();

        // The sensor flags an error while it spins up.
        let running_for = entry.started.map(|started| time - started);
        entry.error = error && running_for.is_some_and(|d| d > TimeDelta::seconds(1));
        entry.pm25 = pm25;
        entry.pm10 = pm10;
        entry.time = Some(time);

        (
            entry.callback.clone(),
            Event::Pm25 {
                pm25,
                pm10,
                error: entry.error,
                time,
            },
        )
    };

    notify(callback, event);
}

fn ir_data(shared: &Shared, report: Report) {
    let Report::Ir { address, data } = report else {
        return;
    };

    let (callback, event) = {
        let mut entry = lock(&shared.ir);
        let time = Utc::now();
        entry.address = address;
        entry.data = data;
        entry.time = Some(time);

        (
            entry.callback.clone(),
            Event::Ir {
                address,
                data,
                time,
            },
        )
    };

    notify(callback, event);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        pins::PinTables,
        state::{DhtEntry, I2cEntry, SonarEntry},
    };
    use kiddee_protocol::{constants::IGNORE, types::DhtReading};
    use std::sync::Mutex;

    fn recorder() -> (Callback, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let callback: Callback = Arc::new(move |event| sink.lock().unwrap().push(event));
        (callback, events)
    }

    fn shared_with_pins() -> Shared {
        let shared = Shared::new();
        let mut map = vec![IGNORE; 14];
        map.extend(0..6);
        *shared.pins.lock().unwrap() = PinTables::from_analog_map(&map);
        shared
    }

    #[test]
    fn table_covers_every_report_kind() {
        let table = dispatch_table();
        assert_eq!(table.len(), 13);
        assert!(table.contains_key(&0xE0));
        assert!(table.contains_key(&0x90));
        assert!(!table.contains_key(&0x51));
    }

    #[test]
    fn analog_honours_differential() {
        let shared = shared_with_pins();
        let (callback, events) = recorder();
        {
            let mut pins = shared.pins.lock().unwrap();
            pins.analog[2].callback = Some(callback);
            pins.analog[2].differential = 5;
        }

        analog_message(&shared, Report::AnalogValue { pin: 2, value: 3 });
        analog_message(&shared, Report::AnalogValue { pin: 2, value: 10 });
        analog_message(&shared, Report::AnalogValue { pin: 2, value: 12 });

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::Analog { pin: 2, value: 10, .. }));
        assert_eq!(shared.pins.lock().unwrap().analog[2].value, 10);
    }

    #[test]
    fn analog_for_unknown_pin_is_ignored() {
        let shared = shared_with_pins();
        analog_message(&shared, Report::AnalogValue { pin: 9, value: 100 });
    }

    #[test]
    fn digital_fires_only_on_change() {
        let shared = shared_with_pins();
        let (callback, events) = recorder();
        {
            let mut pins = shared.pins.lock().unwrap();
            pins.digital[9].callback = Some(callback.clone());
            pins.digital[10].callback = Some(callback);
            pins.digital[10].pull_up = true;
        }

        digital_message(&shared, Report::DigitalPort { port: 1, mask: 0b110 });
        digital_message(&shared, Report::DigitalPort { port: 1, mask: 0b100 });

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Event::Input { pin: 9, value: 1, .. }));
        assert!(matches!(events[1], Event::Pullup { pin: 10, value: 1, .. }));
        assert!(matches!(events[2], Event::Input { pin: 9, value: 0, .. }));

        let pins = shared.pins.lock().unwrap();
        assert_eq!(pins.digital[10].value, 1);
        assert!(pins.digital[8].event_time.is_some());
    }

    #[test]
    fn digital_port_clamped_to_pin_count() {
        let shared = shared_with_pins();
        digital_message(&shared, Report::DigitalPort { port: 2, mask: 0xFF });
        let pins = shared.pins.lock().unwrap();
        assert!(pins.digital[16..20].iter().all(|p| p.value == 1));
    }

    #[test]
    fn i2c_reply_requires_registration() {
        let shared = Shared::new();
        let (callback, events) = recorder();

        i2c_reply(
            &shared,
            Report::I2cReply {
                address: 0x68,
                register: 0x3B,
                data: vec![1, 2],
            },
        );
        assert!(shared.i2c.lock().unwrap().is_empty());

        shared.i2c.lock().unwrap().insert(
            0x68,
            I2cEntry {
                callback: Some(callback),
                register: 0,
                data: None,
                time: None,
            },
        );
        i2c_reply(
            &shared,
            Report::I2cReply {
                address: 0x68,
                register: 0x3B,
                data: vec![1, 2],
            },
        );

        let map = shared.i2c.lock().unwrap();
        assert_eq!(map[&0x68].data, Some(vec![1, 2]));
        assert!(map[&0x68].time.is_some());
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn sonar_with_callback_only_fires_on_nonzero_change() {
        let shared = Shared::new();
        let (callback, events) = recorder();
        shared.sonar.lock().unwrap().insert(
            7,
            SonarEntry {
                callback: Some(callback),
                distance_cm: 0,
                time: None,
            },
        );

        for distance_cm in [0, 25, 25, 0, 30] {
            sonar_data(
                &shared,
                Report::Sonar {
                    trigger_pin: 7,
                    distance_cm,
                },
            );
        }

        let events = events.lock().unwrap();
        let distances: Vec<u16> = events
            .iter()
            .map(|e| match e {
                Event::Sonar { distance_cm, .. } => *distance_cm,
                _ => panic!("unexpected event"),
            })
            .collect();
        assert_eq!(distances, vec![25, 30]);
    }

    #[test]
    fn sonar_without_callback_always_stores() {
        let shared = Shared::new();
        shared.sonar.lock().unwrap().insert(
            7,
            SonarEntry {
                callback: None,
                distance_cm: 5,
                time: None,
            },
        );
        sonar_data(
            &shared,
            Report::Sonar {
                trigger_pin: 7,
                distance_cm: 5,
            },
        );
        let map = shared.sonar.lock().unwrap();
        assert!(map[&7].time.is_some());

        drop(map);
        sonar_data(
            &shared,
            Report::Sonar {
                trigger_pin: 3,
                distance_cm: 5,
            },
        );
        assert!(!shared.sonar.lock().unwrap().contains_key(&3));
    }

    #[test]
    fn dht_checks_humidity_then_temperature() {
        let shared = Shared::new();
        let (callback, events) = recorder();
        shared.dht.lock().unwrap().insert(
            8,
            DhtEntry {
                callback: Some(callback),
                differential: 0.5,
                reading: DhtReading::Valid {
                    humidity: 0.0,
                    temperature: 0.0,
                },
                time: None,
            },
        );

        let send = |humidity, temperature| {
            dht_data(
                &shared,
                Report::Dht {
                    pin: 8,
                    sensor_type: 22,
                    reading: Some(DhtReading::Valid {
                        humidity,
                        temperature,
                    }),
                },
            )
        };

        send(40.0, 20.0);
        // Humidity moved by less than the differential, temperature ignored.
        send(40.2, 25.0);
        send(40.2, 25.1);
        send(40.2, 26.0);

        assert_eq!(events.lock().unwrap().len(), 2);
        assert_eq!(
            shared.dht.lock().unwrap()[&8].reading,
            DhtReading::Valid {
                humidity: 40.2,
                temperature: 26.0
            }
        );
    }

    #[test]
    fn dht_config_ack_only_touches_timestamp() {
        let shared = Shared::new();
        shared.dht.lock().unwrap().insert(
            8,
            DhtEntry {
                callback: None,
                differential: 0.1,
                reading: DhtReading::Valid {
                    humidity: 0.0,
                    temperature: 0.0,
                },
                time: None,
            },
        );
        dht_data(
            &shared,
            Report::Dht {
                pin: 8,
                sensor_type: 22,
                reading: None,
            },
        );
        let map = shared.dht.lock().unwrap();
        assert!(map[&8].time.is_some());
        assert!(!map[&8].reading.is_error());
    }

    #[test]
    fn pm25_error_ignored_while_warming_up() {
        let shared = Shared::new();
        let (callback, events) = recorder();
        {
            let mut entry = shared.pm25.lock().unwrap();
            entry.callback = Some(callback);
            entry.started = Some(Utc::now());
        }

        pm25_data(
            &shared,
            Report::Pm25 {
                pm25: 12,
                pm10: 20,
                error: true,
            },
        );
        assert!(!shared.pm25.lock().unwrap().error);

        shared.pm25.lock().unwrap().started = Some(Utc::now() - TimeDelta::seconds(5));
        pm25_data(
            &shared,
            Report::Pm25 {
                pm25: 12,
                pm10: 20,
                error: true,
            },
        );
        assert!(shared.pm25.lock().unwrap().error);
        assert_eq!(events.lock().unwrap().len(), 2);
    }

    #[test]
    fn ir_always_fires() {
        let shared = Shared::new();
        let (callback, events) = recorder();
        shared.ir.lock().unwrap().callback = Some(callback);

        for _ in 0..2 {
            ir_data(
                &shared,
                Report::Ir {
                    address: 0xFF,
                    data: 0x45,
                },
            );
        }

        assert_eq!(events.lock().unwrap().len(), 2);
        assert_eq!(shared.ir.lock().unwrap().data, 0x45);
    }

    #[test]
    fn query_replies_fill_slots() {
        let shared = Shared::new();
        pin_state_response(
            &shared,
            Report::PinState {
                pin: 3,
                mode: 1,
                state: 1,
            },
        );
        analog_mapping_response(&shared, Report::AnalogMap(vec![IGNORE, 0]));
        assert_eq!(
            shared.replies.pin_state.take(),
            Some(PinState {
                pin: 3,
                mode: 1,
                state: 1
            })
        );
        assert_eq!(shared.replies.analog_map.take(), Some(vec![IGNORE, 0]));
    }
}
