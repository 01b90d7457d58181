//! Enumerations for the four fields of a result code.
//!
//! The numeric values are the ones the guest observes, so they must never be
//! renumbered.

/// Declares a `#[repr(u32)]` enum whose values travel as raw guest words
///
/// The enum gets `raw()` and a `TryFrom<u32>` that hands back the rejected
/// value.
#[macro_export]
macro_rules! raw_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident {
        $($(#[$vmeta:meta])* $vname:ident = $val:expr,)*
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u32)]
        $vis enum $name {
            $($(#[$vmeta])* $vname = $val,)*
        }

        impl $name {
            /// Returns the raw guest value
            #[inline]
            pub const fn raw(self) -> u32 {
                self as u32
            }
        }

        impl ::core::convert::TryFrom<u32> for $name {
            type Error = u32;

            fn try_from(v: u32) -> ::core::result::Result<Self, Self::Error> {
                match v {
                    $(x if x == $name::$vname as u32 => {
                        ::core::result::Result::Ok($name::$vname)
                    })*
                    other => ::core::result::Result::Err(other),
                }
            }
        }
    }
}

raw_enum! {
    /// Subsystem that produced a result code
    pub enum ErrorModule {
        Common = 0,
        Kernel = 1,
        Util = 2,
        FileServer = 3,
        LoaderServer = 4,
        Tcb = 5,
        Os = 6,
        Dbg = 7,
        Dmnt = 8,
        Pdn = 9,
        Gsp = 10,
        I2c = 11,
        Gpio = 12,
        Dd = 13,
        Codec = 14,
        Spi = 15,
        Pxi = 16,
        Fs = 17,
        Di = 18,
        Hid = 19,
        Cam = 20,
        Pi = 21,
        Pm = 22,
        PmLow = 23,
        Fsi = 24,
        Srv = 25,
        Ndm = 26,
        Nwm = 27,
        Soc = 28,
        Ldr = 29,
        Acc = 30,
        RomFs = 31,
        Am = 32,
        Hio = 33,
        Updater = 34,
        Mic = 35,
        Fnd = 36,
        Mp = 37,
        Mpwl = 38,
        Ac = 39,
        Http = 40,
        Dsp = 41,
        Snd = 42,
        Dlp = 43,
        HioLow = 44,
        Csnd = 45,
        Ssl = 46,
        AmLow = 47,
        Nex = 48,
        Friends = 49,
        Rdt = 50,
        Applet = 51,
        Nim = 52,
        Ptm = 53,
        Midi = 54,
        Mc = 55,
        Swc = 56,
        FatFs = 57,
        Ngc = 58,
        Card = 59,
        CardNor = 60,
        Sdmc = 61,
        Boss = 62,
        Dbm = 63,
        Config = 64,
        Ps = 65,
        Cec = 66,
        Ir = 67,
        Uds = 68,
        Pl = 69,
        Cup = 70,
        Gyroscope = 71,
        Mcu = 72,
        Ns = 73,
        News = 74,
        Ro = 75,
        Gd = 76,
        CardSpi = 77,
        Ec = 78,
        WebBrowser = 79,
        Test = 80,
        Enc = 81,
        Pia = 82,
        Application = 254,
        InvalidResult = 255,
    }
}

raw_enum! {
    /// Fine-grained error identifier
    ///
    /// Values 0..1000 are module specific, the rest are shared by every module.
    pub enum ErrorDescription {
        Success = 0,
        OsInvalidBufferDescriptor = 48,
        WrongAddress = 53,
        /// Path does not exist in the archive
        FsNotFound = 120,
        FsNotFormatted = 340,
        InvalidSection = 1000,
        TooLarge = 1001,
        NotAuthorized = 1002,
        AlreadyDone = 1003,
        InvalidSize = 1004,
        InvalidEnumValue = 1005,
        InvalidCombination = 1006,
        NoData = 1007,
        Busy = 1008,
        MisalignedAddress = 1009,
        MisalignedSize = 1010,
        OutOfMemory = 1011,
        NotImplemented = 1012,
        InvalidAddress = 1013,
        InvalidPointer = 1014,
        InvalidHandle = 1015,
        NotInitialized = 1016,
        AlreadyInitialized = 1017,
        NotFound = 1018,
        CancelRequested = 1019,
        AlreadyExists = 1020,
        OutOfRange = 1021,
        Timeout = 1022,
        InvalidResultValue = 1023,
    }
}

raw_enum! {
    /// Coarse error category
    pub enum ErrorSummary {
        Success = 0,
        NothingHappened = 1,
        WouldBlock = 2,
        OutOfResource = 3,
        NotFound = 4,
        InvalidState = 5,
        NotSupported = 6,
        InvalidArgument = 7,
        WrongArgument = 8,
        Canceled = 9,
        StatusChanged = 10,
        Internal = 11,
        InvalidResultValue = 63,
    }
}

raw_enum! {
    /// Severity of a result code
    pub enum ErrorLevel {
        Success = 0,
        Info = 1,
        Status = 25,
        Temporary = 26,
        Permanent = 27,
        Usage = 28,
        Reinitialize = 29,
        Reset = 30,
        Fatal = 31,
    }
}
