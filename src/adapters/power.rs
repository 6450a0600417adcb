//! Wake alarm and light sleep.
//!
//! On the device the alarm is the ESP-IDF sleep timer and low-power mode
//! is light sleep, which keeps RAM (and with it the frame counter) alive.
//! The simulation backend records the calls and returns immediately.

use log::debug;

use crate::app::ports::PowerPort;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[derive(Debug, Default)]
pub struct SleepAdapter {
    /// Alarm interval set by the last `schedule_wake`.
    wake_after_secs: u32,
    armed: bool,
    /// Completed sleeps.
    sleeps: u32,
}

impl SleepAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wake_after_secs(&self) -> u32 {
        self.wake_after_secs
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn sleeps(&self) -> u32 {
        self.sleeps
    }
}

impl PowerPort for SleepAdapter {
    fn schedule_wake(&mut self, secs: u32) {
        self.wake_after_secs = secs;
    }

    fn arm_wake_alarm(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            let us = u64::from(self.wake_after_secs) * 1_000_000;
            // SAFETY: plain configuration call, no pointers involved.
            let ret = unsafe { esp_sleep_enable_timer_wakeup(us) };
            if ret != ESP_OK {
                log::warn!("Power: timer wake-up rejected ({})", ret);
            }
        }
        self.armed = true;
    }

    fn sleep_until_interrupt(&mut self) {
        debug!("Power: sleeping for {} s", self.wake_after_secs);

        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called from the main task; RAM is retained in light sleep.
            let ret = unsafe { esp_light_sleep_start() };
            if ret != ESP_OK {
                log::warn!("Power: light sleep refused ({})", ret);
            }
        }
        self.sleeps = self.sleeps.wrapping_add(1);
    }

    fn disarm_wake_alarm(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: plain configuration call, no pointers involved.
            unsafe {
                esp_sleep_disable_wakeup_source(esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER);
            }
        }
        self.armed = false;
    }
}
