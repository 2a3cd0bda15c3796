use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    error::Error,
    rc::Rc,
};

use joyshock::{
    calibration::{CalibrationSource, StickCalibration},
    config::SessionConfig,
    drivers::{
        device::{Connection, DeviceFamily},
        switch::hid_report::{BatteryLevel, PackedInputDataReport},
        transport::{Transport, TransportError},
    },
    session::{DeviceSession, SessionError},
};

/// Pretends to be a controller: serves flash reads from an image,
/// acknowledges everything else and hands out queued input reports when
/// nothing was asked.
#[derive(Clone, Default)]
struct FakeController {
    flash: Rc<HashMap<u32, Vec<u8>>>,
    writes: Rc<RefCell<Vec<Vec<u8>>>>,
    input: Rc<RefCell<Vec<Vec<u8>>>>,
    pending: Rc<Cell<bool>>,
}

impl Transport for FakeController {
    fn write(&self, buf: &[u8]) -> Result<usize, TransportError> {
        self.writes.borrow_mut().push(buf.to_vec());
        self.pending.set(true);
        Ok(buf.len())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        buf.fill(0);
        if !self.pending.replace(false) {
            let Some(report) = self.input.borrow_mut().pop() else {
                return Ok(0);
            };
            buf[..report.len()].copy_from_slice(&report);
            return Ok(report.len());
        }

        let writes = self.writes.borrow();
        let Some(request) = writes.last() else {
            return Ok(0);
        };
        if request.len() == 0x16 && request[0] == 0x01 && request[10] == 0x10 {
            let offset = u32::from_le_bytes([request[11], request[12], request[13], request[14]]);
            let length = request[15] as usize;
            let mut data = self.flash.get(&offset).cloned().unwrap_or_default();
            data.resize(length, 0);
            buf[0x0D] = 0x90;
            buf[0x0E] = 0x10;
            buf[0x0F..0x13].copy_from_slice(&offset.to_le_bytes());
            buf[0x14..0x14 + length].copy_from_slice(&data);
            return Ok(0x14 + length);
        }
        Ok(buf.len().min(0x40))
    }

    fn set_blocking_mode(&self, _blocking: bool) -> Result<(), TransportError> {
        Ok(())
    }
}

fn flash_image() -> HashMap<u32, Vec<u8>> {
    let mut factory_stick = vec![0u8; 0x12];
    // Left: max, center, min
    factory_stick[0..3].copy_from_slice(&[0x00, 0x05, 0x50]);
    factory_stick[3..6].copy_from_slice(&[0x00, 0x08, 0x80]);
    factory_stick[6..9].copy_from_slice(&[0x00, 0x05, 0x50]);
    // Right: center, min, max
    factory_stick[9..12].copy_from_slice(&[0x00, 0x08, 0x80]);
    factory_stick[12..15].copy_from_slice(&[0x00, 0x05, 0x50]);
    factory_stick[15..18].copy_from_slice(&[0x00, 0x05, 0x50]);

    let colors = vec![
        0x32, 0x32, 0x32, 0xFF, 0xFF, 0xFF, 0x0A, 0xB9, 0xE6, 0xFF, 0x3C, 0x28,
    ];

    HashMap::from([(0x603D, factory_stick), (0x6050, colors)])
}

fn fake_controller() -> FakeController {
    FakeController {
        flash: Rc::new(flash_image()),
        ..Default::default()
    }
}

/// Standard input report with both sticks at `stick` and the given raw gyro
/// in the latest IMU frame
fn input_report(stick: [u8; 3], gyro: [i16; 3]) -> Vec<u8> {
    let mut buf = vec![0u8; 0x40];
    buf[0] = 0x30;
    buf[6..9].copy_from_slice(&stick);
    buf[9..12].copy_from_slice(&stick);
    for (i, value) in gyro.iter().enumerate() {
        let at = 37 + 6 + i * 2;
        buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }
    buf
}

#[test]
fn test_pro_controller_session() -> Result<(), Box<dyn Error>> {
    let controller = fake_controller();
    let mut session = DeviceSession::new(
        controller.clone(),
        DeviceFamily::ProController,
        Connection::Bluetooth,
        &SessionConfig::default(),
    );
    assert_eq!(session.name(), "Pro Controller");

    let calibration = *session.init()?;
    let left = calibration.sticks.left;
    assert_eq!(left.source, CalibrationSource::Factory);
    assert_eq!(
        (left.x.min, left.x.center, left.x.max),
        (0x300, 0x800, 0xD00)
    );
    assert_eq!(
        (left.y.min, left.y.center, left.y.max),
        (0x300, 0x800, 0xD00)
    );
    assert_eq!(calibration.sticks.right, left);
    assert_eq!(calibration.colors.map(|c| c.right_grip), Some(0xFF3C28));

    // Flash access goes through the session too
    assert_eq!(session.read_flash(0x6050, 3)?, vec![0x32, 0x32, 0x32]);

    // Full deflection on X, center on Y
    controller
        .input
        .borrow_mut()
        .push(input_report([0x00, 0x0D, 0x80], [0, 0, 0]));
    let Some(sample) = session.read_report()? else {
        panic!("Expected an input sample");
    };
    assert_eq!(sample.left_stick, (1.0, 0.0));
    assert_eq!(sample.right_stick, (1.0, 0.0));

    // Nothing pending
    assert!(session.read_report()?.is_none());

    session.deinit()?;
    assert!(!session.is_connected());
    let result = session.set_player_lights(0x01);
    assert!(matches!(
        result,
        Err(SessionError::Switch(
            joyshock::drivers::switch::driver::DriverError::Transport(
                TransportError::NotConnected
            )
        ))
    ));

    Ok(())
}

#[test]
fn test_joycon_right_has_no_left_stick() -> Result<(), Box<dyn Error>> {
    let controller = fake_controller();
    let mut session = DeviceSession::new(
        controller,
        DeviceFamily::JoyConR,
        Connection::Bluetooth,
        &SessionConfig::default(),
    );
    let calibration = *session.init()?;
    assert_eq!(calibration.sticks.left, StickCalibration::default());
    assert_eq!(calibration.sticks.right.x.center, 0x800);

    let mut buf = input_report([0x00, 0x0D, 0x80], [0, 0, 0]);
    buf.truncate(49);
    let report = PackedInputDataReport::unpack_from(&buf)?;
    let sample = session.process_report(&report);
    assert_eq!(sample.left_stick, (0.0, 0.0));
    assert_eq!(sample.right_stick, (1.0, 0.0));

    Ok(())
}

#[test]
fn test_continuous_calibration() -> Result<(), Box<dyn Error>> {
    let config = SessionConfig::from_yaml("continuous_calibration: true".to_string())?;
    let controller = fake_controller();
    let mut session = DeviceSession::new(
        controller.clone(),
        DeviceFamily::JoyConL,
        Connection::Bluetooth,
        &config,
    );
    session.init()?;

    // No samples yet, the offset stays at zero
    assert_eq!(session.average(), [0.0, 0.0, 0.0]);

    for _ in 0..3 {
        controller
            .input
            .borrow_mut()
            .push(input_report([0x00, 0x08, 0x80], [100, 0, -100]));
    }
    for _ in 0..3 {
        assert!(session.read_report()?.is_some());
    }
    let [x, y, z] = session.average();
    assert!(x > 0.0);
    assert_eq!(y, 0.0);
    assert!((x + z).abs() < 1e-6);

    // The last offset is kept after a reset until new samples arrive
    session.reset_calibration();
    assert_eq!(session.gyro_averager().average(), None);
    assert_eq!(session.average(), [x, y, z]);

    // Samples are not collected once disabled
    session.set_continuous_calibration(false);
    controller
        .input
        .borrow_mut()
        .push(input_report([0x00, 0x08, 0x80], [100, 0, -100]));
    assert!(session.read_report()?.is_some());
    assert_eq!(session.gyro_averager().average(), None);

    Ok(())
}

#[test]
fn test_push_sample() -> Result<(), Box<dyn Error>> {
    let mut session = DeviceSession::new(
        fake_controller(),
        DeviceFamily::ProController,
        Connection::Bluetooth,
        &SessionConfig::default(),
    );
    assert_eq!(session.gyro_averager().sample_rate(), 67);
    assert_eq!(session.gyro_averager().horizon_seconds(), 600);

    session.push_sample(0.5, 0.25, -0.5);
    assert_eq!(session.average(), [0.5, 0.25, -0.5]);

    Ok(())
}

#[test]
fn test_dualshock4_session() -> Result<(), Box<dyn Error>> {
    let controller = FakeController::default();
    let mut session = DeviceSession::new(
        controller.clone(),
        DeviceFamily::DualShock4,
        Connection::Usb,
        &SessionConfig::default(),
    );
    assert_eq!(session.gyro_averager().sample_rate(), 250);

    let calibration = *session.init()?;
    assert_eq!(calibration.sticks.left.source, CalibrationSource::Fallback);
    assert_eq!(calibration.sticks.left.x.max, 255);
    assert!(calibration.sensor.is_none());
    assert!(calibration.colors.is_none());

    session.set_lights_and_rumble(0, 200, 255, 0, 0)?;

    let result = session.rumble(100, 3);
    assert!(matches!(
        result,
        Err(SessionError::Unsupported {
            family: DeviceFamily::DualShock4,
            ..
        })
    ));
    assert!(session.read_flash(0x6020, 0x18).is_err());

    session.deinit()?;
    assert!(!session.is_connected());
    assert!(session.set_lights_and_rumble(0, 0, 0, 0, 0).is_err());

    let writes = controller.writes.borrow();
    assert_eq!(writes.len(), 3);
    assert!(writes.iter().all(|w| w.len() == 31 && w[0] == 0x05));
    assert_eq!(writes[1][5], 200);
    assert_eq!(writes[1][6], 255);
    // Deinit turns the light bar flash off
    assert_eq!(writes[2][9], 0x00);
    assert_eq!(writes[2][10], 0x00);

    Ok(())
}

#[test]
fn test_switch_rejects_dualshock4_output() -> Result<(), Box<dyn Error>> {
    let mut session = DeviceSession::new(
        fake_controller(),
        DeviceFamily::JoyConL,
        Connection::Bluetooth,
        &SessionConfig::default(),
    );
    let result = session.set_lights_and_rumble(0, 0, 255, 0, 0);
    assert!(matches!(
        result,
        Err(SessionError::Unsupported {
            family: DeviceFamily::JoyConL,
            ..
        })
    ));

    Ok(())
}

#[test]
fn test_buttons_and_battery() -> Result<(), Box<dyn Error>> {
    let mut session = DeviceSession::new(
        fake_controller(),
        DeviceFamily::ProController,
        Connection::Bluetooth,
        &SessionConfig::default(),
    );
    session.init()?;

    let mut buf = input_report([0x00, 0x08, 0x80], [0, 0, 0]);
    // Full battery, charging
    buf[2] = 0x90;
    // A and plus
    buf[3] = 0x08;
    buf[4] = 0x02;
    let report = PackedInputDataReport::unpack_from(&buf)?;
    let sample = session.process_report(&report);
    assert!(sample.buttons.a);
    assert!(sample.buttons.plus);
    assert!(!sample.buttons.b);
    assert_eq!(sample.battery.battery_level, BatteryLevel::Full);
    assert!(sample.battery.charging);

    Ok(())
}

#[test]
fn test_uncalibrated_samples_are_not_averaged() -> Result<(), Box<dyn Error>> {
    let config = SessionConfig::from_yaml("continuous_calibration: true".to_string())?;
    let mut session = DeviceSession::new(
        fake_controller(),
        DeviceFamily::JoyConL,
        Connection::Bluetooth,
        &config,
    );

    // No IMU calibration before init
    let buf = input_report([0x00, 0x08, 0x80], [100, 0, 0]);
    let report = PackedInputDataReport::unpack_from(&buf)?;
    let sample = session.process_report(&report);
    assert_eq!(sample.gyro, [0.0, 0.0, 0.0]);
    assert_eq!(session.gyro_averager().average(), None);

    session.init()?;
    session.process_report(&report);
    assert!(session.gyro_averager().average().is_some());

    Ok(())
}
